#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Neuro-evolutionary driving simulation.
//!
//! A [`Simulation`] owns a population of cars racing on one [`Track`]. Every
//! tick each live car senses the walls, asks its network (or the player) for
//! controls, moves, and is checked for crashes and checkpoint progress. Once
//! no car is left driving the simulation announces
//! [`Event::GenerationFinished`] and waits for the orchestrator to breed the
//! next generation and hand it back through [`Command::StartGeneration`].

mod car;
mod sensors;
pub mod track;

use std::{f32::consts::PI, sync::Arc, time::Duration};

use arena_core::{geometry::wrap_angle, is_stable_tick};
use arena_neural::{Network, NetworkError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use car::{collides, fitness, Car, CarId, CarSnapshot, Controls, Kinematics, CAR_RADIUS};
pub use sensors::{sensor_fan, Sensor, SENSOR_ANGLES, SENSOR_COUNT, SENSOR_LENGTH};
pub use track::{
    BuiltinTracks, TomlTrackFile, Track, TrackError, TrackLibrary, TrackSupplier, DEFAULT_TRACK,
};

/// Number of values fed to a car's network. The last slot is always zero.
pub const INPUT_COUNT: usize = SENSOR_COUNT + 3;

/// Number of network outputs read as controls.
pub const OUTPUT_COUNT: usize = 4;

/// A car passes a checkpoint when closer than this to the gate's start point.
pub const CHECKPOINT_RADIUS: f32 = 30.0;

/// Smallest accepted time-scale multiplier.
pub const MIN_TIME_SCALE: f32 = 0.1;

/// Largest accepted time-scale multiplier.
pub const MAX_TIME_SCALE: f32 = 10.0;

/// Tunable parameters of the driving simulation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrivingConfig {
    /// Number of cars per generation.
    pub population: usize,
    /// Network topology, input layer first.
    pub layers: Vec<usize>,
    /// Multiplier applied to every tick delta.
    pub time_scale: f32,
    /// Whether car 0 follows the controls supplied with each tick.
    pub player_controlled: bool,
    /// Seed for the initial population.
    pub seed: u64,
    /// Identifier of the track selected at start-up.
    pub track: String,
    /// Kinematic constants shared by every car.
    pub kinematics: Kinematics,
    /// Optional cap on simulated seconds per generation.
    pub generation_time_limit: Option<f32>,
}

impl Default for DrivingConfig {
    fn default() -> Self {
        Self {
            population: 50,
            layers: vec![INPUT_COUNT, 12, 8, OUTPUT_COUNT],
            time_scale: 1.0,
            player_controlled: false,
            seed: 0x5eed_cafe,
            track: DEFAULT_TRACK.to_owned(),
            kinematics: Kinematics::default(),
            generation_time_limit: None,
        }
    }
}

/// Problems preventing a simulation from being built.
#[derive(Debug, Error)]
pub enum DrivingError {
    /// The configured track could not be found or loaded.
    #[error(transparent)]
    Track(#[from] TrackError),
    /// The configured topology cannot produce networks.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The topology does not match the car's inputs and outputs.
    #[error("network topology must take 8 inputs and produce at least 4 outputs")]
    Topology,
    /// A generation needs at least one car.
    #[error("population must not be empty")]
    EmptyPopulation,
}

/// Reasons a proposed generation is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The number of brains differs from the configured population.
    #[error("expected {expected} brains, got {actual}")]
    PopulationSize {
        /// Configured population.
        expected: usize,
        /// Number of brains supplied.
        actual: usize,
    },
    /// A brain cannot read the car's inputs or produce its controls.
    #[error("brain {index} has an incompatible topology")]
    Topology {
        /// Position of the offending brain.
        index: usize,
    },
}

/// Commands accepted by [`apply`].
#[derive(Clone, Debug)]
pub enum Command {
    /// Advances the simulation by `dt` before time scaling.
    Tick {
        /// Real time elapsed since the previous tick.
        dt: Duration,
        /// Input for the player car; ignored without one.
        player: Controls,
    },
    /// Starts or pauses tick processing.
    SetRunning {
        /// Whether ticks should be processed.
        running: bool,
    },
    /// Changes the time-scale multiplier.
    SetTimeScale {
        /// Requested multiplier.
        scale: f32,
    },
    /// Switches to another track, restarting the current generation on it.
    SelectTrack {
        /// Identifier of the track.
        id: String,
    },
    /// Replaces the population with the supplied brains.
    StartGeneration {
        /// One brain per car, in car order.
        brains: Vec<Arc<Network>>,
    },
    /// Restores the initial state with a fresh random population.
    Reset,
}

/// Events emitted by [`apply`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Tick processing was started or paused.
    RunningChanged {
        /// Whether ticks are processed.
        running: bool,
    },
    /// The time-scale multiplier changed.
    TimeScaleChanged {
        /// Multiplier now in effect.
        scale: f32,
    },
    /// Simulated time advanced by the scaled delta.
    TimeAdvanced {
        /// Scaled delta.
        dt: Duration,
    },
    /// A tick was dropped because its scaled delta was too large.
    TickDiscarded {
        /// Scaled delta that was rejected.
        dt: Duration,
    },
    /// A car touched a wall.
    CarCrashed {
        /// Car that crashed.
        car: CarId,
        /// Fitness at the moment of the crash.
        fitness: f64,
    },
    /// A car reached its next checkpoint.
    CheckpointPassed {
        /// Car that progressed.
        car: CarId,
        /// Index of the checkpoint.
        checkpoint: usize,
        /// Checkpoints passed by the car this generation.
        passed: u32,
    },
    /// No car is driving any more; the population awaits evolution.
    GenerationFinished {
        /// Generation that ended.
        generation: u32,
        /// Best fitness reached.
        best_fitness: f64,
        /// Mean fitness of the population.
        average_fitness: f64,
    },
    /// A new generation took over.
    GenerationAdvanced {
        /// Number of the new generation.
        generation: u32,
    },
    /// A proposed generation was refused; the previous one stays in place.
    GenerationRejected {
        /// Why it was refused.
        reason: GenerationError,
    },
    /// A new track was selected.
    TrackSelected {
        /// Identifier of the track.
        id: String,
    },
    /// A requested track does not exist.
    TrackRejected {
        /// Identifier that was requested.
        id: String,
    },
    /// The simulation returned to generation 1 and paused.
    SimulationReset,
}

/// Authoritative state of the driving simulation.
#[derive(Debug)]
pub struct Simulation {
    config: DrivingConfig,
    library: TrackLibrary,
    track: Track,
    cars: Vec<Car>,
    generation: u32,
    running: bool,
    time_scale: f32,
    generation_time: Duration,
    finished: bool,
    all_time_best: f64,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Builds a simulation over the built-in tracks.
    pub fn new(config: DrivingConfig) -> Result<Self, DrivingError> {
        Self::with_library(config, TrackLibrary::builtin())
    }

    /// Builds a simulation choosing its track from `library`.
    pub fn with_library(config: DrivingConfig, library: TrackLibrary) -> Result<Self, DrivingError> {
        if config.population == 0 {
            return Err(DrivingError::EmptyPopulation);
        }
        if config.layers.first() != Some(&INPUT_COUNT)
            || config.layers.last().map_or(true, |outputs| *outputs < OUTPUT_COUNT)
        {
            return Err(DrivingError::Topology);
        }

        let track = library.get(&config.track)?.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let brains = random_population(&config, &mut rng)?;
        let time_scale = clamp_time_scale(config.time_scale).unwrap_or(1.0);

        let mut simulation = Self {
            config,
            library,
            track,
            cars: Vec::new(),
            generation: 1,
            running: false,
            time_scale,
            generation_time: Duration::ZERO,
            finished: false,
            all_time_best: 0.0,
            rng,
        };
        simulation.spawn_cars(brains);
        Ok(simulation)
    }

    fn spawn_cars(&mut self, brains: Vec<Arc<Network>>) {
        let start = self.track.start_position;
        let heading = self.track.start_heading;
        self.cars = brains
            .into_iter()
            .enumerate()
            .map(|(index, brain)| {
                Car::new(
                    CarId::new(index as u32),
                    start,
                    heading,
                    self.config.kinematics,
                    brain,
                    self.config.player_controlled && index == 0,
                )
            })
            .collect();
        self.generation_time = Duration::ZERO;
        self.finished = false;
    }

    fn current_brains(&self) -> Vec<Arc<Network>> {
        self.cars.iter().map(|car| Arc::clone(car.brain())).collect()
    }

    fn best_fitness(&self) -> f64 {
        self.cars.iter().map(Car::fitness).fold(0.0, f64::max)
    }

    fn average_fitness(&self) -> f64 {
        if self.cars.is_empty() {
            return 0.0;
        }
        self.cars.iter().map(Car::fitness).sum::<f64>() / self.cars.len() as f64
    }

    fn tick(&mut self, dt: Duration, player: Controls, out_events: &mut Vec<Event>) {
        out_events.push(Event::TimeAdvanced { dt });
        self.generation_time = self.generation_time.saturating_add(dt);
        let seconds = dt.as_secs_f32();

        for car in self.cars.iter_mut().filter(|car| car.is_alive()) {
            car.sense(&self.track.walls);
            let controls = if car.is_player() {
                player
            } else {
                let inputs = network_inputs(car, &self.track);
                match car.brain().evaluate(&inputs) {
                    Ok(outputs) => Controls::from_outputs(&outputs),
                    Err(error) => {
                        warn!(car = car.id().get(), %error, "network evaluation failed");
                        Controls::default()
                    }
                }
            };
            car.drive(controls, seconds);
            let crashed = car.check_collision(&self.track.walls);

            if let Some(next) = self.track.next_checkpoint(car.last_checkpoint()) {
                let gate = self.track.checkpoints[next].start;
                if car.position().distance(gate) < CHECKPOINT_RADIUS {
                    car.pass_checkpoint(next);
                    out_events.push(Event::CheckpointPassed {
                        car: car.id(),
                        checkpoint: next,
                        passed: car.checkpoints_passed(),
                    });
                }
            }

            let fitness = car.refresh_fitness();
            if crashed {
                debug!(car = car.id().get(), fitness, "car crashed");
                out_events.push(Event::CarCrashed {
                    car: car.id(),
                    fitness,
                });
            }
        }

        let out_of_time = self
            .config
            .generation_time_limit
            .is_some_and(|limit| self.generation_time.as_secs_f32() >= limit);
        if out_of_time {
            for car in self.cars.iter_mut().filter(|car| car.is_alive()) {
                car.retire();
                let _ = car.refresh_fitness();
            }
        }

        let best = self.best_fitness();
        if best > self.all_time_best {
            self.all_time_best = best;
        }

        if self.cars.iter().all(|car| !car.is_alive()) {
            self.finished = true;
            let average = self.average_fitness();
            info!(
                generation = self.generation,
                best,
                average,
                "generation finished"
            );
            out_events.push(Event::GenerationFinished {
                generation: self.generation,
                best_fitness: best,
                average_fitness: average,
            });
        }
    }

    fn start_generation(&mut self, brains: Vec<Arc<Network>>, out_events: &mut Vec<Event>) {
        if brains.len() != self.config.population {
            let reason = GenerationError::PopulationSize {
                expected: self.config.population,
                actual: brains.len(),
            };
            warn!(%reason, "generation rejected");
            out_events.push(Event::GenerationRejected { reason });
            return;
        }
        if let Some(index) = brains.iter().position(|brain| {
            brain.input_len() != INPUT_COUNT || brain.output_len() < OUTPUT_COUNT
        }) {
            let reason = GenerationError::Topology { index };
            warn!(%reason, "generation rejected");
            out_events.push(Event::GenerationRejected { reason });
            return;
        }

        self.generation = self.generation.saturating_add(1);
        self.spawn_cars(brains);
        info!(generation = self.generation, "generation advanced");
        out_events.push(Event::GenerationAdvanced {
            generation: self.generation,
        });
    }
}

/// Inputs fed to a car's network.
///
/// Five normalised sensor readings, speed over top speed and the signed angle
/// to the next checkpoint over π, which is zero on tracks without
/// checkpoints. The trailing slot is padding and stays zero.
#[must_use]
pub fn network_inputs(car: &Car, track: &Track) -> [f64; INPUT_COUNT] {
    let mut inputs = [0.0; INPUT_COUNT];
    for (slot, sensor) in inputs.iter_mut().zip(car.sensors()) {
        *slot = f64::from(sensor.normalized());
    }

    let max_speed = car.kinematics().max_speed;
    if max_speed > 0.0 {
        inputs[SENSOR_COUNT] = f64::from(car.speed() / max_speed);
    }

    if let Some(next) = track.next_checkpoint(car.last_checkpoint()) {
        let offset = track.checkpoints[next].start - car.position();
        let bearing = offset.y.atan2(offset.x);
        inputs[SENSOR_COUNT + 1] = f64::from(wrap_angle(bearing - car.heading()) / PI);
    }

    inputs
}

fn random_population(
    config: &DrivingConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Arc<Network>>, NetworkError> {
    (0..config.population)
        .map(|_| Network::random(&config.layers, rng).map(Arc::new))
        .collect()
}

fn scale_delta(dt: Duration, scale: f32) -> Duration {
    let nanos = dt.as_nanos() as f64 * f64::from(scale);
    Duration::from_nanos(nanos.round() as u64)
}

fn clamp_time_scale(scale: f32) -> Option<f32> {
    (scale.is_finite() && scale > 0.0).then(|| scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE))
}

/// Applies the provided command to the simulation, emitting resulting events.
pub fn apply(simulation: &mut Simulation, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt, player } => {
            if !simulation.running || simulation.finished {
                return;
            }
            let scaled = scale_delta(dt, simulation.time_scale);
            if !is_stable_tick(scaled) {
                warn!(?scaled, "discarding oversized tick");
                out_events.push(Event::TickDiscarded { dt: scaled });
                return;
            }
            simulation.tick(scaled, player, out_events);
        }
        Command::SetRunning { running } => {
            if simulation.running != running {
                simulation.running = running;
                out_events.push(Event::RunningChanged { running });
            }
        }
        Command::SetTimeScale { scale } => match clamp_time_scale(scale) {
            Some(scale) => {
                simulation.time_scale = scale;
                out_events.push(Event::TimeScaleChanged { scale });
            }
            None => warn!(scale, "ignoring invalid time scale"),
        },
        Command::SelectTrack { id } => match simulation.library.get(&id) {
            Ok(track) => {
                simulation.track = track.clone();
                let brains = simulation.current_brains();
                simulation.spawn_cars(brains);
                info!(track = %id, "track selected");
                out_events.push(Event::TrackSelected { id });
            }
            Err(error) => {
                warn!(%error, "track selection rejected");
                out_events.push(Event::TrackRejected { id });
            }
        },
        Command::StartGeneration { brains } => simulation.start_generation(brains, out_events),
        Command::Reset => {
            let brains = match random_population(&simulation.config, &mut simulation.rng) {
                Ok(brains) => brains,
                Err(error) => {
                    warn!(%error, "reset failed to build a population");
                    return;
                }
            };
            simulation.generation = 1;
            simulation.running = false;
            simulation.all_time_best = 0.0;
            simulation.spawn_cars(brains);
            info!("simulation reset");
            out_events.push(Event::SimulationReset);
        }
    }
}

/// Query functions that provide read-only access to the simulation.
pub mod query {
    use std::sync::Arc;

    use arena_neural::Network;

    use super::{CarSnapshot, Simulation, Track};

    /// Per-tick summary consumed by renderers.
    #[derive(Clone, Debug, PartialEq)]
    pub struct DrivingSnapshot {
        /// Current generation number, starting at 1.
        pub generation: u32,
        /// Whether ticks are processed.
        pub running: bool,
        /// Every car of the generation.
        pub cars: Vec<CarSnapshot>,
        /// Number of cars still driving.
        pub alive: usize,
        /// Best fitness in the current generation.
        pub best_fitness: f64,
        /// Mean fitness in the current generation.
        pub average_fitness: f64,
        /// Best fitness seen since the last reset.
        pub all_time_best: f64,
    }

    /// Captures the dynamic state of the simulation.
    #[must_use]
    pub fn snapshot(simulation: &Simulation) -> DrivingSnapshot {
        let cars: Vec<CarSnapshot> = simulation.cars.iter().map(|car| car.snapshot()).collect();
        DrivingSnapshot {
            generation: simulation.generation,
            running: simulation.running,
            alive: cars.iter().filter(|car| car.alive).count(),
            cars,
            best_fitness: simulation.best_fitness(),
            average_fitness: simulation.average_fitness(),
            all_time_best: simulation.all_time_best,
        }
    }

    /// Static geometry of the selected track.
    #[must_use]
    pub fn track(simulation: &Simulation) -> &Track {
        &simulation.track
    }

    /// Identifiers of every selectable track.
    pub fn track_ids(simulation: &Simulation) -> impl Iterator<Item = &str> {
        simulation.library.ids()
    }

    /// Current generation number.
    #[must_use]
    pub fn generation(simulation: &Simulation) -> u32 {
        simulation.generation
    }

    /// Reports whether ticks are processed.
    #[must_use]
    pub fn is_running(simulation: &Simulation) -> bool {
        simulation.running
    }

    /// Reports whether the generation ended and awaits its successor.
    #[must_use]
    pub fn is_generation_finished(simulation: &Simulation) -> bool {
        simulation.finished
    }

    /// Active time-scale multiplier.
    #[must_use]
    pub fn time_scale(simulation: &Simulation) -> f32 {
        simulation.time_scale
    }

    /// Brains ordered by descending fitness, ties by car id.
    #[must_use]
    pub fn ranked_brains(simulation: &Simulation) -> Vec<Arc<Network>> {
        let mut ranked: Vec<_> = simulation.cars.iter().collect();
        ranked.sort_by(|a, b| {
            b.fitness()
                .total_cmp(&a.fitness())
                .then_with(|| a.id().cmp(&b.id()))
        });
        ranked.into_iter().map(|car| Arc::clone(car.brain())).collect()
    }
}
