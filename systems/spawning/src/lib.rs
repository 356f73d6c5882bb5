#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for populating announced waves.

use arena_core::{Command, EnemyKind, Event, SPAWN_STAGGER};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::debug;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpawningConfig {
    /// Seed for the generator that picks enemy archetypes.
    pub seed: u64,
}

impl Default for SpawningConfig {
    fn default() -> Self {
        Self {
            seed: 0x4d59_5df4_d0f3_3173,
        }
    }
}

impl SpawningConfig {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }
}

/// Pure system that turns wave announcements into staggered spawn commands.
#[derive(Debug)]
pub struct Spawning {
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: SpawningConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Consumes events and emits one `SpawnEnemy` per announced enemy.
    ///
    /// The `i`-th enemy of a wave waits `i × SPAWN_STAGGER` cells behind the
    /// spawn cell and has a uniformly random archetype.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            let Event::WaveStarted { wave, enemy_count } = event else {
                continue;
            };

            debug!(wave, enemy_count, "populating wave");
            out.reserve(*enemy_count as usize);
            for index in 0..*enemy_count {
                let kind = self.next_kind();
                out.push(Command::SpawnEnemy {
                    kind,
                    stagger: index as f32 * SPAWN_STAGGER,
                });
            }
        }
    }

    fn next_kind(&mut self) -> EnemyKind {
        EnemyKind::ALL[self.rng.gen_range(0..EnemyKind::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_events_spawn_nothing() {
        let mut spawning = Spawning::new(SpawningConfig::default());
        let mut out = Vec::new();
        spawning.handle(&[Event::WorldReset], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn stagger_grows_with_spawn_order() {
        let mut spawning = Spawning::new(SpawningConfig::new(3));
        let mut out = Vec::new();
        spawning.handle(
            &[Event::WaveStarted {
                wave: 1,
                enemy_count: 4,
            }],
            &mut out,
        );

        let staggers: Vec<f32> = out
            .iter()
            .map(|command| match command {
                Command::SpawnEnemy { stagger, .. } => *stagger,
                other => panic!("unexpected command emitted: {other:?}"),
            })
            .collect();
        assert_eq!(staggers.len(), 4);
        for (index, stagger) in staggers.iter().enumerate() {
            assert!((stagger - index as f32 * 0.8).abs() < 1e-6);
        }
    }
}
