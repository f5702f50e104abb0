//! Recurrent carries threaded between control steps.
//!
//! A carry stacks one hidden vector per recurrent layer for every environment
//! in the batch: `[depth, batch, hidden]`. Actor and critic each own one; the
//! two are never shared.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};

use crate::error::{PolicyError, Result};

/// Stacked hidden state of one recurrent network.
#[derive(Debug, Clone)]
pub struct RecurrentCarry<B: Backend> {
    /// Hidden states [depth, batch, hidden]
    pub state: Tensor<B, 3>,
}

impl<B: Backend> RecurrentCarry<B> {
    pub fn new(state: Tensor<B, 3>) -> Self {
        Self { state }
    }

    /// Zero carry, the state every episode starts from.
    pub fn zeros(depth: usize, batch_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self::new(Tensor::zeros([depth, batch_size, hidden_size], device))
    }

    /// Stack per-layer states [batch, hidden] into a carry.
    pub fn from_layers(layers: Vec<Tensor<B, 2>>) -> Self {
        Self::new(Tensor::stack(layers, 0))
    }

    pub fn depth(&self) -> usize {
        self.state.dims()[0]
    }

    pub fn batch_size(&self) -> usize {
        self.state.dims()[1]
    }

    pub fn hidden_size(&self) -> usize {
        self.state.dims()[2]
    }

    /// Hidden state of layer `index`: [batch, hidden].
    pub fn layer(&self, index: usize) -> Tensor<B, 2> {
        let [_, batch, hidden] = self.state.dims();
        self.state
            .clone()
            .slice([index..index + 1, 0..batch, 0..hidden])
            .reshape([batch, hidden])
    }

    /// Zero this carry wherever `done` is set.
    ///
    /// The zero carry and the current carry are both materialised and one is
    /// selected per environment, so every batch element runs the same ops.
    pub fn reset_where(self, done: &Tensor<B, 1, Bool>) -> Self {
        let [depth, batch, hidden] = self.state.dims();
        let mask: Tensor<B, 3, Bool> = done
            .clone()
            .reshape([1, batch, 1])
            .expand([depth, batch, hidden]);
        let fresh = Tensor::zeros([depth, batch, hidden], &self.state.device());
        Self::new(self.state.mask_where(mask, fresh))
    }

    /// Flatten to host memory, `[depth, batch, hidden]` row-major.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.state.clone().into_data().to_vec::<f32>()?)
    }

    /// Same tensor with the autodiff graph cut.
    pub fn detach(self) -> Self {
        Self::new(self.state.detach())
    }
}

/// Actor and critic carries travelling together through a rollout.
#[derive(Debug, Clone)]
pub struct ModelCarry<B: Backend> {
    pub actor: RecurrentCarry<B>,
    pub critic: RecurrentCarry<B>,
}

impl<B: Backend> ModelCarry<B> {
    pub fn new(actor: RecurrentCarry<B>, critic: RecurrentCarry<B>) -> Self {
        Self { actor, critic }
    }

    pub fn batch_size(&self) -> usize {
        self.actor.batch_size()
    }

    /// Zero both carries where `done` is set.
    pub fn reset_where(self, done: &Tensor<B, 1, Bool>) -> Self {
        Self::new(self.actor.reset_where(done), self.critic.reset_where(done))
    }

    pub fn detach(self) -> Self {
        Self::new(self.actor.detach(), self.critic.detach())
    }
}

/// Done flags as a boolean selector tensor [batch].
pub fn done_mask<B: Backend>(done: &[bool], device: &B::Device) -> Tensor<B, 1, Bool> {
    let flags: Vec<f32> = done.iter().map(|&d| if d { 1.0 } else { 0.0 }).collect();
    Tensor::<B, 1>::from_floats(flags.as_slice(), device).greater_elem(0.5)
}

/// Fail unless `done` has one flag per environment.
pub fn check_done_len(done: &[bool], batch_size: usize) -> Result<()> {
    if done.len() != batch_size {
        return Err(PolicyError::BatchMismatch {
            expected: batch_size,
            actual: done.len(),
        });
    }
    Ok(())
}
