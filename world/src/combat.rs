//! Projectile flight and cosmetic hit particles.

use std::f32::consts::TAU;

use arena_core::{ParticleSnapshot, ProjectileKind, ProjectileSnapshot};
use glam::Vec2;
use rand::Rng;

/// Distance below which a projectile counts as having reached its aim point.
pub(crate) const ARRIVAL_EPSILON: f32 = 0.3;

/// Largest per-axis offset between aim point and enemy that still counts as a hit.
pub(crate) const HIT_TOLERANCE: f32 = 0.5;

/// Number of particles emitted by a single hit.
pub(crate) const PARTICLES_PER_HIT: usize = 6;

/// Velocity multiplier applied to particles every tick.
const PARTICLE_DRAG: f32 = 0.98;

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) kind: ProjectileKind,
    pub(crate) position: Vec2,
    pub(crate) aim: Vec2,
    pub(crate) damage: u32,
}

impl Projectile {
    pub(crate) fn launch(kind: ProjectileKind, from: Vec2, aim: Vec2, damage: u32) -> Self {
        Self {
            kind,
            position: from,
            aim,
            damage,
        }
    }

    /// Moves toward the aim point; returns `true` once the projectile has arrived.
    ///
    /// Arrival is checked before moving, so a projectile that lands on its aim
    /// point resolves on the following tick.
    pub(crate) fn advance(&mut self, dt: f32) -> bool {
        let delta = self.aim - self.position;
        let distance = delta.length();
        if distance < ARRIVAL_EPSILON {
            return true;
        }
        let step = (self.kind.speed() * dt).min(distance);
        self.position += delta / distance * step;
        false
    }

    /// Reports whether a target standing at `position` is struck on arrival.
    pub(crate) fn strikes(&self, position: Vec2) -> bool {
        (position.x - self.aim.x).abs() < HIT_TOLERANCE
            && (position.y - self.aim.y).abs() < HIT_TOLERANCE
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            kind: self.kind,
            position: self.position,
            aim: self.aim,
            damage: self.damage,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Particle {
    position: Vec2,
    velocity: Vec2,
    life: f32,
    size: f32,
}

impl Particle {
    /// Applies one tick of motion and decay; returns `false` once expired.
    fn step(&mut self, dt: f32) -> bool {
        self.position += self.velocity * dt;
        self.velocity *= PARTICLE_DRAG;
        self.life -= 1.0;
        self.life > 0.0
    }

    pub(crate) fn snapshot(&self) -> ParticleSnapshot {
        ParticleSnapshot {
            position: self.position,
            velocity: self.velocity,
            life: self.life,
            size: self.size,
        }
    }
}

/// Appends a ring of evenly spaced particles bursting out of `origin`.
pub(crate) fn burst<R: Rng>(rng: &mut R, origin: Vec2, out: &mut Vec<Particle>) {
    for index in 0..PARTICLES_PER_HIT {
        let angle = index as f32 / PARTICLES_PER_HIT as f32 * TAU;
        let speed: f32 = rng.gen_range(2.0..5.0);
        out.push(Particle {
            position: origin,
            velocity: Vec2::new(angle.cos(), angle.sin()) * speed,
            life: rng.gen_range(30.0..50.0),
            size: rng.gen_range(2.0..5.0),
        });
    }
}

/// Advances every particle and drops the expired ones.
pub(crate) fn step_particles(particles: &mut Vec<Particle>, dt: f32) {
    particles.retain_mut(|particle| particle.step(dt));
}
