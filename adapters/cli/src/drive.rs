//! Headless driving session that breeds generations back to back.

use std::{fmt, path::Path};

use anyhow::{bail, Context, Result};
use arena_driving::{
    apply, query, Command, Controls, Event, Simulation, TomlTrackFile, TrackLibrary,
};
use arena_system_evolution::Evolver;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::{config::ArenaConfig, defence::FRAME};

/// Mixed into the driving seed so evolution draws from its own stream.
const EVOLUTION_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

pub(crate) struct DriveSession {
    simulation: Simulation,
    evolver: Evolver,
    rng: ChaCha8Rng,
}

impl DriveSession {
    /// Builds the simulation, adding the tracks of `track_file` to the
    /// built-in ones.
    pub(crate) fn new(config: &ArenaConfig, track_file: Option<&Path>) -> Result<Self> {
        let mut library = TrackLibrary::builtin();
        if let Some(path) = track_file {
            library
                .extend_from(&TomlTrackFile::new(path))
                .with_context(|| format!("failed to load tracks from {}", path.display()))?;
        }

        let simulation = Simulation::with_library(config.driving.clone(), library)
            .context("failed to build the driving simulation")?;
        Ok(Self {
            simulation,
            evolver: Evolver::new(config.evolution),
            rng: ChaCha8Rng::seed_from_u64(config.driving.seed ^ EVOLUTION_SALT),
        })
    }

    /// Plays `generations` generations, or until `max_ticks` frames ran.
    pub(crate) fn run(&mut self, generations: u32, max_ticks: u64) -> Result<DriveSummary> {
        let mut events = Vec::new();
        apply(
            &mut self.simulation,
            Command::SetRunning { running: true },
            &mut events,
        );

        let mut reports = Vec::new();
        let mut crashes = 0;
        let mut checkpoints = 0;
        let mut ticks = 0;
        while reports.len() < generations as usize && ticks < max_ticks {
            events.clear();
            apply(
                &mut self.simulation,
                Command::Tick {
                    dt: FRAME,
                    player: Controls::default(),
                },
                &mut events,
            );
            ticks += 1;

            let mut finished = false;
            for event in &events {
                match *event {
                    Event::CarCrashed { .. } => crashes += 1,
                    Event::CheckpointPassed { .. } => checkpoints += 1,
                    Event::TickDiscarded { dt } => {
                        warn!(?dt, "time scale too large for the frame length");
                    }
                    Event::GenerationFinished {
                        generation,
                        best_fitness,
                        average_fitness,
                    } => {
                        reports.push(GenerationReport {
                            generation,
                            best_fitness,
                            average_fitness,
                            crashes,
                            checkpoints,
                        });
                        crashes = 0;
                        checkpoints = 0;
                        finished = true;
                    }
                    _ => {}
                }
            }

            if finished && reports.len() < generations as usize {
                self.advance()?;
            }
        }

        let snapshot = query::snapshot(&self.simulation);
        info!(
            generations = reports.len(),
            all_time_best = snapshot.all_time_best,
            "driving run finished"
        );
        Ok(DriveSummary {
            track: query::track(&self.simulation).name.clone(),
            generations: reports,
            ticks,
            all_time_best: snapshot.all_time_best,
        })
    }

    fn advance(&mut self) -> Result<()> {
        let ranked = query::ranked_brains(&self.simulation);
        let brains = self
            .evolver
            .evolve(&ranked, &mut self.rng)
            .context("failed to breed the next generation")?;

        let mut events = Vec::new();
        apply(
            &mut self.simulation,
            Command::StartGeneration { brains },
            &mut events,
        );
        for event in events {
            if let Event::GenerationRejected { reason } = event {
                bail!("next generation was rejected: {reason}");
            }
        }
        Ok(())
    }
}

/// Statistics of one finished generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GenerationReport {
    pub(crate) generation: u32,
    pub(crate) best_fitness: f64,
    pub(crate) average_fitness: f64,
    pub(crate) crashes: u32,
    pub(crate) checkpoints: u32,
}

/// Outcome of a headless driving run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DriveSummary {
    pub(crate) track: String,
    pub(crate) generations: Vec<GenerationReport>,
    pub(crate) ticks: u64,
    pub(crate) all_time_best: f64,
}

impl fmt::Display for DriveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "track: {}", self.track)?;
        for report in &self.generations {
            writeln!(
                f,
                "generation {:>3}: best {:>8.1}  average {:>8.1}  crashes {:>3}  checkpoints {:>4}",
                report.generation,
                report.best_fitness,
                report.average_fitness,
                report.crashes,
                report.checkpoints
            )?;
        }
        write!(
            f,
            "all-time best {:.1} after {:.1}s simulated",
            self.all_time_best,
            FRAME.as_secs_f64() * self.ticks as f64
        )
    }
}
