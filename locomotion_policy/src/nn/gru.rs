//! Single-step GRU cell with fused gate projections.
//!
//! The input side and the hidden side each use one projection producing all
//! three gate pre-activations `[reset | update | candidate]`, which are then
//! sliced apart. Only the input side carries a bias.

use burn::module::Module;
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::projection::{Projection, ProjectionConfig};
use crate::core::rng::RngKey;

/// Configuration for [`GruCell`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GruCellConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    /// Bias on the input-side gate projection.
    pub bias: bool,
}

impl GruCellConfig {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            bias: true,
        }
    }

    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    /// Draw the cell's parameters from `key`.
    pub fn init<B: Backend>(&self, key: RngKey, device: &B::Device) -> GruCell<B> {
        let (input_key, hidden_key) = key.split();
        let gates = 3 * self.hidden_size;

        GruCell {
            input_gates: ProjectionConfig::new(self.input_size, gates)
                .with_bias(self.bias)
                .init::<B>(input_key, device),
            hidden_gates: ProjectionConfig::new(self.hidden_size, gates)
                .with_bias(false)
                .init::<B>(hidden_key, device),
            hidden_size: self.hidden_size,
        }
    }
}

/// GRU cell; `h' = n + z ⊙ (h - n)` with reset gate `r` applied to the
/// hidden-side candidate term.
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    input_gates: Projection<B>,
    hidden_gates: Projection<B>,
    #[module(skip)]
    hidden_size: usize,
}

impl<B: Backend> GruCell<B> {
    /// Advance one step: `input` [batch, input_size], `hidden` [batch, hidden_size].
    pub fn step(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let from_input = self.input_gates.forward(input);
        let from_hidden = self.hidden_gates.forward(hidden.clone());
        let gate = |t: &Tensor<B, 2>, i: usize| {
            let [batch, _] = t.dims();
            t.clone()
                .slice([0..batch, i * self.hidden_size..(i + 1) * self.hidden_size])
        };

        let reset = sigmoid(gate(&from_input, 0) + gate(&from_hidden, 0));
        let update = sigmoid(gate(&from_input, 1) + gate(&from_hidden, 1));
        let candidate = (gate(&from_input, 2) + reset * gate(&from_hidden, 2)).tanh();

        candidate.clone() + update * (hidden - candidate)
    }

    pub fn input_size(&self) -> usize {
        self.input_gates.input_size()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
