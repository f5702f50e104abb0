//! Stack of GRU cells sharing one hidden width.

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::gru::{GruCell, GruCellConfig};
use crate::core::carry::RecurrentCarry;
use crate::core::rng::RngKey;

/// Configuration for [`RecurrentStack`].
#[derive(Debug, Clone)]
pub struct RecurrentStackConfig {
    pub hidden_size: usize,
    pub depth: usize,
}

impl RecurrentStackConfig {
    pub fn new(hidden_size: usize, depth: usize) -> Self {
        Self { hidden_size, depth }
    }

    pub fn init<B: Backend>(&self, key: RngKey, device: &B::Device) -> RecurrentStack<B> {
        let layers = key
            .split_n(self.depth)
            .into_iter()
            .map(|k| GruCellConfig::new(self.hidden_size, self.hidden_size).init::<B>(k, device))
            .collect();

        RecurrentStack {
            layers,
            hidden_size: self.hidden_size,
        }
    }
}

/// Ordered GRU layers; layer `i` reads layer `i - 1`'s output.
#[derive(Module, Debug)]
pub struct RecurrentStack<B: Backend> {
    layers: Vec<GruCell<B>>,
    #[module(skip)]
    hidden_size: usize,
}

impl<B: Backend> RecurrentStack<B> {
    /// Advance every layer by one step.
    ///
    /// `input` is [batch, hidden]; `carry` is [depth, batch, hidden].
    /// Returns the last layer's output and the updated carry.
    pub fn step(
        &self,
        input: Tensor<B, 2>,
        carry: &RecurrentCarry<B>,
    ) -> (Tensor<B, 2>, RecurrentCarry<B>) {
        let mut x = input;
        let mut next = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.step(x, carry.layer(i));
            next.push(x.clone());
        }
        (x, RecurrentCarry::from_layers(next))
    }

    /// Zero carry matching this stack.
    pub fn initial_carry(&self, batch_size: usize, device: &B::Device) -> RecurrentCarry<B> {
        RecurrentCarry::zeros(self.layers.len(), batch_size, self.hidden_size, device)
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_stack_step_shapes() {
        let device = Default::default();
        let stack = RecurrentStackConfig::new(4, 3).init::<B>(RngKey::new(0), &device);
        let carry = stack.initial_carry(2, &device);

        let (out, next) = stack.step(Tensor::ones([2, 4], &device), &carry);
        assert_eq!(out.dims(), [2, 4]);
        assert_eq!(next.state.dims(), [3, 2, 4]);
    }

    #[test]
    fn test_output_is_last_layer_state() {
        let device = Default::default();
        let stack = RecurrentStackConfig::new(3, 2).init::<B>(RngKey::new(1), &device);
        let carry = stack.initial_carry(1, &device);

        let (out, next) = stack.step(Tensor::ones([1, 3], &device), &carry);
        let out = out.into_data().to_vec::<f32>().unwrap();
        let last = next.layer(1).into_data().to_vec::<f32>().unwrap();
        assert_eq!(out, last);
    }

    #[test]
    fn test_layers_feed_forward_in_order() {
        let device = Default::default();
        let stack = RecurrentStackConfig::new(3, 2).init::<B>(RngKey::new(2), &device);
        let carry = stack.initial_carry(1, &device);
        let x = Tensor::<B, 2>::from_floats([[0.5, -0.5, 1.0]], &device);

        let (_, next) = stack.step(x.clone(), &carry);
        let h0 = stack.layers[0].step(x, carry.layer(0));
        let h1 = stack.layers[1].step(h0.clone(), carry.layer(1));

        assert_eq!(
            next.layer(0).into_data().to_vec::<f32>().unwrap(),
            h0.into_data().to_vec::<f32>().unwrap()
        );
        assert_eq!(
            next.layer(1).into_data().to_vec::<f32>().unwrap(),
            h1.into_data().to_vec::<f32>().unwrap()
        );
    }
}
