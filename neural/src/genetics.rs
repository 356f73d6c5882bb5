use rand::Rng;

use crate::{Network, NetworkError};

/// Largest magnitude of the perturbation applied by a mutation.
pub const MUTATION_STEP: f64 = 0.2;

pub(crate) fn mutate<R: Rng + ?Sized>(network: &Network, rate: f64, rng: &mut R) -> Network {
    let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
    let mut perturb = |value: f64| {
        if rate > 0.0 && rng.gen_bool(rate) {
            value + rng.gen_range(-MUTATION_STEP..MUTATION_STEP)
        } else {
            value
        }
    };

    let weights: Vec<Vec<Vec<f64>>> = network
        .weights
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|row| row.iter().map(|weight| perturb(*weight)).collect())
                .collect()
        })
        .collect();
    let biases: Vec<Vec<f64>> = network
        .biases
        .iter()
        .map(|layer| layer.iter().map(|bias| perturb(*bias)).collect())
        .collect();

    Network {
        layer_sizes: network.layer_sizes.clone(),
        weights,
        biases,
    }
}

/// Builds a child whose every parameter is taken from either parent with
/// equal probability.
///
/// Parents with different topologies are rejected.
pub fn crossover<R: Rng + ?Sized>(
    first: &Network,
    second: &Network,
    rng: &mut R,
) -> Result<Network, NetworkError> {
    if !first.same_shape(second) {
        return Err(NetworkError::ShapeMismatch {
            detail: format!(
                "cannot cross {:?} with {:?}",
                first.layer_sizes, second.layer_sizes
            ),
        });
    }

    let mut pick = |a: f64, b: f64| if rng.gen_bool(0.5) { a } else { b };

    let weights: Vec<Vec<Vec<f64>>> = first
        .weights
        .iter()
        .zip(&second.weights)
        .map(|(layer_a, layer_b)| {
            layer_a
                .iter()
                .zip(layer_b)
                .map(|(row_a, row_b)| {
                    row_a
                        .iter()
                        .zip(row_b)
                        .map(|(a, b)| pick(*a, *b))
                        .collect()
                })
                .collect()
        })
        .collect();
    let biases: Vec<Vec<f64>> = first
        .biases
        .iter()
        .zip(&second.biases)
        .map(|(layer_a, layer_b)| {
            layer_a
                .iter()
                .zip(layer_b)
                .map(|(a, b)| pick(*a, *b))
                .collect()
        })
        .collect();

    Ok(Network {
        layer_sizes: first.layer_sizes.clone(),
        weights,
        biases,
    })
}
