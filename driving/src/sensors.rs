//! Ray-cast distance sensors mounted on every car.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use arena_core::geometry::{raycast, Segment};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of rays in a sensor fan.
pub const SENSOR_COUNT: usize = 5;

/// Maximum reach of each ray.
pub const SENSOR_LENGTH: f32 = 100.0;

/// Ray angles relative to the car heading.
pub const SENSOR_ANGLES: [f32; SENSOR_COUNT] = [-FRAC_PI_2, -FRAC_PI_4, 0.0, FRAC_PI_4, FRAC_PI_2];

/// A single distance sensor and its latest reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Angle relative to the car heading.
    pub angle: f32,
    /// Maximum reach.
    pub length: f32,
    /// Distance to the nearest wall, or `length` when nothing was hit.
    pub distance: f32,
    /// Whether the last cast hit a wall.
    pub hit: bool,
}

impl Sensor {
    /// Creates a sensor reporting a clear reading.
    #[must_use]
    pub const fn new(angle: f32, length: f32) -> Self {
        Self {
            angle,
            length,
            distance: length,
            hit: false,
        }
    }

    /// Reading scaled into `[0, 1]`, where 1 means nothing in reach.
    #[must_use]
    pub fn normalized(&self) -> f32 {
        if self.length > 0.0 {
            (self.distance / self.length).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Casts the ray from `origin` along `heading + angle`.
    pub fn update(&mut self, origin: Vec2, heading: f32, walls: &[Segment]) {
        let hit = raycast(origin, heading + self.angle, self.length, walls);
        self.distance = hit.distance;
        self.hit = hit.hit;
    }
}

/// The standard five-ray fan.
#[must_use]
pub fn sensor_fan() -> [Sensor; SENSOR_COUNT] {
    SENSOR_ANGLES.map(|angle| Sensor::new(angle, SENSOR_LENGTH))
}
