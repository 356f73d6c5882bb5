#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Generational genetic algorithm over shared network handles.
//!
//! The caller ranks the previous generation by descending fitness. Elites
//! survive untouched and keep their `Arc`, the next block are mutated clones
//! of the elites, and the remainder are mutated crossovers of two random
//! elites.

use std::sync::Arc;

use arena_neural::{crossover, Network, NetworkError};
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// Tunable parameters of the genetic algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Share of the population kept unchanged.
    pub elite_fraction: f64,
    /// Mutation rate applied to cloned elites.
    pub clone_mutation_rate: f64,
    /// Mutation rate applied to crossover children.
    pub child_mutation_rate: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            elite_fraction: 0.2,
            clone_mutation_rate: 0.1,
            child_mutation_rate: 0.05,
        }
    }
}

/// Produces successive generations from ranked populations.
#[derive(Clone, Debug, Default)]
pub struct Evolver {
    config: EvolutionConfig,
}

impl Evolver {
    /// Creates an evolver using the supplied configuration.
    #[must_use]
    pub fn new(config: EvolutionConfig) -> Self {
        Self { config }
    }

    /// Number of elites kept for a population of `population` networks.
    ///
    /// At least one network survives whenever the population is non-empty.
    #[must_use]
    pub fn elite_count(&self, population: usize) -> usize {
        if population == 0 {
            return 0;
        }
        let fraction = if self.config.elite_fraction.is_finite() {
            self.config.elite_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((population as f64 * fraction).floor() as usize).clamp(1, population)
    }

    /// Builds the next generation from `ranked`, best first.
    ///
    /// The result has the same length as the input. Elites are returned as
    /// the very same handles so callers can detect survivors with
    /// `Arc::ptr_eq`.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        ranked: &[Arc<Network>],
        rng: &mut R,
    ) -> Result<Vec<Arc<Network>>, NetworkError> {
        let population = ranked.len();
        let elites = self.elite_count(population);
        let mut next = Vec::with_capacity(population);

        for index in 0..population {
            let network = if index < elites {
                Arc::clone(&ranked[index])
            } else if index < 2 * elites {
                let parent = &ranked[index % elites];
                Arc::new(parent.mutate(self.config.clone_mutation_rate, rng))
            } else {
                let first = &ranked[rng.gen_range(0..elites)];
                let second = &ranked[rng.gen_range(0..elites)];
                let child = crossover(first, second, rng)?;
                Arc::new(child.mutate(self.config.child_mutation_rate, rng))
            };
            next.push(network);
        }

        debug!(population, elites, "evolved generation");
        Ok(next)
    }
}
