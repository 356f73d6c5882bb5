//! Car kinematics, collision and fitness.

use std::sync::Arc;

use arena_core::geometry::{heading_vector, Segment};
use arena_neural::Network;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sensors::{sensor_fan, Sensor, SENSOR_COUNT};

/// Distance from a wall below which a car crashes.
pub const CAR_RADIUS: f32 = 8.0;

/// Minimum absolute speed for steering to have an effect.
const STEERING_THRESHOLD: f32 = 0.1;

/// Speed below which a live car counts as stalled.
const STALL_SPEED: f32 = 0.1;

/// Identifier of a car within a generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CarId(u32);

impl CarId {
    /// Creates a new identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Kinematic constants shared by every car.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kinematics {
    /// Top forward speed; reverse is capped at half of it.
    pub max_speed: f32,
    /// Speed gained or lost per second of throttle or brake.
    pub acceleration: f32,
    /// Multiplier applied to the speed on ticks without throttle or brake.
    pub friction: f32,
    /// Heading change per second at top speed.
    pub turn_rate: f32,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            max_speed: 200.0,
            acceleration: 300.0,
            friction: 0.95,
            turn_rate: 3.0,
        }
    }
}

/// Driver input for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    /// Accelerate forwards.
    pub forward: bool,
    /// Brake and reverse.
    pub backward: bool,
    /// Steer counter-clockwise.
    pub left: bool,
    /// Steer clockwise.
    pub right: bool,
}

impl Controls {
    /// Reads controls from network outputs; a key is pressed above 0.5.
    ///
    /// Missing outputs count as released.
    #[must_use]
    pub fn from_outputs(outputs: &[f64]) -> Self {
        let pressed = |index: usize| outputs.get(index).is_some_and(|value| *value > 0.5);
        Self {
            forward: pressed(0),
            backward: pressed(1),
            left: pressed(2),
            right: pressed(3),
        }
    }
}

/// Fitness of a car: progress rewarded, stalling penalised, never negative.
#[must_use]
pub fn fitness(distance_traveled: f32, checkpoints_passed: u32, alive: bool, speed: f32) -> f64 {
    let mut score = 0.1 * f64::from(distance_traveled) + 1000.0 * f64::from(checkpoints_passed);
    if alive {
        score += 500.0;
        if speed < STALL_SPEED {
            score -= 10.0;
        }
    }
    score.max(0.0)
}

/// Reports whether a car at `position` touches any of `walls`.
#[must_use]
pub fn collides(position: Vec2, walls: &[Segment]) -> bool {
    walls
        .iter()
        .any(|wall| wall.distance_to_point(position) < CAR_RADIUS)
}

/// A single agent of the driving population.
#[derive(Clone, Debug)]
pub struct Car {
    id: CarId,
    position: Vec2,
    velocity: Vec2,
    heading: f32,
    speed: f32,
    kinematics: Kinematics,
    sensors: [Sensor; SENSOR_COUNT],
    brain: Arc<Network>,
    fitness: f64,
    alive: bool,
    distance_traveled: f32,
    checkpoints_passed: u32,
    last_checkpoint: Option<usize>,
    player: bool,
}

impl Car {
    /// Places a fresh car at the given pose.
    #[must_use]
    pub fn new(
        id: CarId,
        position: Vec2,
        heading: f32,
        kinematics: Kinematics,
        brain: Arc<Network>,
        player: bool,
    ) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            heading,
            speed: 0.0,
            kinematics,
            sensors: sensor_fan(),
            brain,
            fitness: fitness(0.0, 0, true, 0.0),
            alive: true,
            distance_traveled: 0.0,
            checkpoints_passed: 0,
            last_checkpoint: None,
            player,
        }
    }

    /// Identifier of the car.
    #[must_use]
    pub fn id(&self) -> CarId {
        self.id
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Signed speed along the heading.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Heading in radians.
    #[must_use]
    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Kinematic constants the car drives with.
    #[must_use]
    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// Latest sensor readings.
    #[must_use]
    pub fn sensors(&self) -> &[Sensor; SENSOR_COUNT] {
        &self.sensors
    }

    /// Network steering the car.
    #[must_use]
    pub fn brain(&self) -> &Arc<Network> {
        &self.brain
    }

    /// Most recently computed fitness.
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Whether the car is still driving.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Whether the car follows external input instead of its network.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.player
    }

    /// Index of the last checkpoint passed, if any.
    #[must_use]
    pub fn last_checkpoint(&self) -> Option<usize> {
        self.last_checkpoint
    }

    /// Number of checkpoints passed this generation.
    #[must_use]
    pub fn checkpoints_passed(&self) -> u32 {
        self.checkpoints_passed
    }

    /// Refreshes every sensor against `walls`.
    pub fn sense(&mut self, walls: &[Segment]) {
        for sensor in &mut self.sensors {
            sensor.update(self.position, self.heading, walls);
        }
    }

    /// Applies `controls` for `dt` seconds. Crashed cars do not move.
    pub fn drive(&mut self, controls: Controls, dt: f32) {
        if !self.alive {
            return;
        }

        let Kinematics {
            max_speed,
            acceleration,
            friction,
            turn_rate,
        } = self.kinematics;

        if controls.forward {
            self.speed = (self.speed + acceleration * dt).min(max_speed);
        } else if controls.backward {
            self.speed = (self.speed - acceleration * dt).max(-max_speed * 0.5);
        } else {
            self.speed *= friction;
        }

        if self.speed.abs() > STEERING_THRESHOLD && max_speed > 0.0 {
            let turn = turn_rate * dt * self.speed.abs() / max_speed;
            if controls.left {
                self.heading -= turn;
            }
            if controls.right {
                self.heading += turn;
            }
        }

        self.velocity = heading_vector(self.heading) * self.speed;
        self.position += self.velocity * dt;
        self.distance_traveled += self.velocity.length() * dt;
    }

    /// Marks the car crashed when it touches a wall. Returns whether the car
    /// crashed during this call.
    pub fn check_collision(&mut self, walls: &[Segment]) -> bool {
        if !self.alive || !collides(self.position, walls) {
            return false;
        }
        self.alive = false;
        true
    }

    /// Stops the car where it stands without a crash.
    pub(crate) fn retire(&mut self) {
        self.alive = false;
    }

    pub(crate) fn pass_checkpoint(&mut self, index: usize) {
        self.checkpoints_passed = self.checkpoints_passed.saturating_add(1);
        self.last_checkpoint = Some(index);
    }

    /// Recomputes and returns the car's fitness.
    pub fn refresh_fitness(&mut self) -> f64 {
        self.fitness = fitness(
            self.distance_traveled,
            self.checkpoints_passed,
            self.alive,
            self.speed,
        );
        self.fitness
    }

    /// Captures the car's state for rendering or inspection.
    #[must_use]
    pub fn snapshot(&self) -> CarSnapshot {
        CarSnapshot {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            heading: self.heading,
            speed: self.speed,
            sensors: self.sensors,
            fitness: self.fitness,
            alive: self.alive,
            distance_traveled: self.distance_traveled,
            checkpoints_passed: self.checkpoints_passed,
            last_checkpoint: self.last_checkpoint,
            player: self.player,
        }
    }
}

/// Immutable representation of a car used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CarSnapshot {
    /// Identifier of the car.
    pub id: CarId,
    /// Current position.
    pub position: Vec2,
    /// Velocity during the last tick.
    pub velocity: Vec2,
    /// Heading in radians.
    pub heading: f32,
    /// Signed speed.
    pub speed: f32,
    /// Latest sensor readings.
    pub sensors: [Sensor; SENSOR_COUNT],
    /// Latest fitness.
    pub fitness: f64,
    /// Whether the car is still driving.
    pub alive: bool,
    /// Path length driven this generation.
    pub distance_traveled: f32,
    /// Checkpoints passed this generation.
    pub checkpoints_passed: u32,
    /// Index of the last checkpoint passed.
    pub last_checkpoint: Option<usize>,
    /// Whether the car is player controlled.
    pub player: bool,
}
