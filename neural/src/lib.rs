#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-topology feed-forward networks used as driving controllers.
//!
//! A [`Network`] is a stack of fully connected layers with sigmoid
//! activations. Networks are immutable once built: mutation and crossover
//! produce fresh networks so a population can share parents through `Arc`
//! handles without copying.

mod genetics;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use genetics::{crossover, MUTATION_STEP};

/// Pre-activations are clamped to this magnitude before the sigmoid.
pub const ACTIVATION_CLAMP: f64 = 30.0;

/// Structural problems detected while building or evaluating a network.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// A network needs an input layer and at least one further layer.
    #[error("a network needs at least two layers, got {layers}")]
    TooFewLayers {
        /// Number of layers supplied.
        layers: usize,
    },
    /// Layers must hold at least one neuron.
    #[error("layer {layer} has no neurons")]
    EmptyLayer {
        /// Index of the empty layer.
        layer: usize,
    },
    /// Weight or bias dimensions disagree with the layer sizes, or two
    /// networks combined by crossover have different topologies.
    #[error("network shape mismatch: {detail}")]
    ShapeMismatch {
        /// Human readable description of the first disagreement found.
        detail: String,
    },
    /// Input vector length differs from the input layer size.
    #[error("expected {expected} inputs, got {actual}")]
    InputLength {
        /// Size of the input layer.
        expected: usize,
        /// Length of the supplied input vector.
        actual: usize,
    },
}

/// Feed-forward network with one weight matrix and bias vector per layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layer_sizes: Vec<usize>,
    /// `weights[l][j][k]` connects neuron `k` of layer `l` to neuron `j` of
    /// layer `l + 1`.
    weights: Vec<Vec<Vec<f64>>>,
    biases: Vec<Vec<f64>>,
}

impl Network {
    /// Builds a network with every weight and bias drawn from `U[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        rng: &mut R,
    ) -> Result<Self, NetworkError> {
        validate_layers(layer_sizes)?;

        let mut weights = Vec::with_capacity(layer_sizes.len() - 1);
        let mut biases = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let (inputs, outputs) = (pair[0], pair[1]);
            let mut layer: Vec<Vec<f64>> = Vec::with_capacity(outputs);
            let mut layer_biases: Vec<f64> = Vec::with_capacity(outputs);
            for _ in 0..outputs {
                layer.push((0..inputs).map(|_| rng.gen_range(-1.0..1.0)).collect());
                layer_biases.push(rng.gen_range(-1.0..1.0));
            }
            weights.push(layer);
            biases.push(layer_biases);
        }

        Ok(Self {
            layer_sizes: layer_sizes.to_vec(),
            weights,
            biases,
        })
    }

    /// Assembles a network from explicit parameters, validating every shape.
    pub fn from_parts(
        layer_sizes: Vec<usize>,
        weights: Vec<Vec<Vec<f64>>>,
        biases: Vec<Vec<f64>>,
    ) -> Result<Self, NetworkError> {
        validate_layers(&layer_sizes)?;
        let transitions = layer_sizes.len() - 1;
        if weights.len() != transitions || biases.len() != transitions {
            return Err(NetworkError::ShapeMismatch {
                detail: format!(
                    "{transitions} layer transitions but {} weight matrices and {} bias vectors",
                    weights.len(),
                    biases.len()
                ),
            });
        }

        for (layer, pair) in layer_sizes.windows(2).enumerate() {
            let (inputs, outputs) = (pair[0], pair[1]);
            if weights[layer].len() != outputs || biases[layer].len() != outputs {
                return Err(NetworkError::ShapeMismatch {
                    detail: format!("layer {layer} must have {outputs} neurons"),
                });
            }
            if let Some(row) = weights[layer].iter().position(|row| row.len() != inputs) {
                return Err(NetworkError::ShapeMismatch {
                    detail: format!("neuron {row} of layer {layer} must have {inputs} weights"),
                });
            }
        }

        Ok(Self {
            layer_sizes,
            weights,
            biases,
        })
    }

    /// Number of neurons per layer, input layer first.
    #[must_use]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    /// Weight matrices, one per layer transition.
    #[must_use]
    pub fn weights(&self) -> &[Vec<Vec<f64>>] {
        &self.weights
    }

    /// Bias vectors, one per layer transition.
    #[must_use]
    pub fn biases(&self) -> &[Vec<f64>] {
        &self.biases
    }

    /// Expected length of the input vector.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    /// Length of the produced output vector.
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    /// Reports whether `other` has the same topology.
    #[must_use]
    pub fn same_shape(&self, other: &Network) -> bool {
        self.layer_sizes == other.layer_sizes
    }

    /// Total number of weights and biases.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.layer_sizes
            .windows(2)
            .map(|pair| pair[0] * pair[1] + pair[1])
            .sum()
    }

    /// Propagates `inputs` through every layer.
    ///
    /// Every output lies strictly inside `(0, 1)`.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
        if inputs.len() != self.input_len() {
            return Err(NetworkError::InputLength {
                expected: self.input_len(),
                actual: inputs.len(),
            });
        }

        let mut activations = inputs.to_vec();
        for (layer, biases) in self.weights.iter().zip(&self.biases) {
            activations = layer
                .iter()
                .zip(biases)
                .map(|(row, bias)| {
                    let sum = row
                        .iter()
                        .zip(&activations)
                        .fold(*bias, |acc, (weight, input)| acc + weight * input);
                    sigmoid(sum)
                })
                .collect();
        }
        Ok(activations)
    }

    /// Returns a copy where each parameter, with probability `rate`, is
    /// shifted by a value drawn from `U[-0.2, 0.2)`.
    #[must_use]
    pub fn mutate<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Network {
        genetics::mutate(self, rate, rng)
    }
}

/// Free-function form of [`Network::evaluate`].
pub fn evaluate(network: &Network, inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
    network.evaluate(inputs)
}

/// Logistic activation with the input clamped to [`ACTIVATION_CLAMP`].
///
/// NaN maps to the midpoint, `sigmoid(0) = 0.5`.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    let x = if x.is_nan() {
        0.0
    } else {
        x.clamp(-ACTIVATION_CLAMP, ACTIVATION_CLAMP)
    };
    1.0 / (1.0 + (-x).exp())
}

fn validate_layers(layer_sizes: &[usize]) -> Result<(), NetworkError> {
    if layer_sizes.len() < 2 {
        return Err(NetworkError::TooFewLayers {
            layers: layer_sizes.len(),
        });
    }
    if let Some(layer) = layer_sizes.iter().position(|size| *size == 0) {
        return Err(NetworkError::EmptyLayer { layer });
    }
    Ok(())
}
