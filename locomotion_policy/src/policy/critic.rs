//! Recurrent value network.
//!
//! Same shape as the actor with a one-wide head. The critic reads privileged
//! simulator state and only runs during training.

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::config::ModelConfig;
use crate::core::carry::RecurrentCarry;
use crate::core::rng::RngKey;
use crate::nn::projection::{Projection, ProjectionConfig};
use crate::nn::stack::{RecurrentStack, RecurrentStackConfig};

#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    pub(crate) input_proj: Projection<B>,
    pub(crate) rnn: RecurrentStack<B>,
    pub(crate) output_proj: Projection<B>,
    #[module(skip)]
    num_inputs: usize,
}

impl<B: Backend> Critic<B> {
    pub(crate) fn new(config: &ModelConfig, key: RngKey, device: &B::Device) -> Self {
        let keys = key.split_n(3);
        Self {
            input_proj: ProjectionConfig::new(config.critic_input_size, config.hidden_size)
                .init(keys[0], device),
            rnn: RecurrentStackConfig::new(config.hidden_size, config.depth).init(keys[1], device),
            output_proj: ProjectionConfig::new(config.hidden_size, 1)
                .with_init(config.output_init)
                .init(keys[2], device),
            num_inputs: config.critic_input_size,
        }
    }

    /// Value estimate [batch] and candidate next carry.
    pub fn forward(
        &self,
        obs: Tensor<B, 2>,
        carry: &RecurrentCarry<B>,
    ) -> (Tensor<B, 1>, RecurrentCarry<B>) {
        let batch = obs.dims()[0];
        let x = self.input_proj.forward(obs);
        let (x, next_carry) = self.rnn.step(x, carry);
        let value = self.output_proj.forward(x).reshape([batch]);
        (value, next_carry)
    }

    pub fn initial_carry(&self, batch_size: usize, device: &B::Device) -> RecurrentCarry<B> {
        self.rnn.initial_carry(batch_size, device)
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }
}
