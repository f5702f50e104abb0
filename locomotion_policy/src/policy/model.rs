//! Actor-critic container.
//!
//! The model exclusively owns one actor and one critic. Their parameters are
//! drawn from independent sub-keys and nothing is shared between them. The
//! input layouts used to flatten observation bundles are stored alongside the
//! parameters so rollout and training always concatenate channels the same way.

use burn::module::{Ignored, Module};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::actor::Actor;
use super::critic::Critic;
use crate::config::ModelConfig;
use crate::core::bundle::{ChannelBundle, InputLayout};
use crate::core::carry::ModelCarry;
use crate::core::rng::RngKey;
use crate::error::Result;

#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    pub actor: Actor<B>,
    pub critic: Critic<B>,
    actor_layout: Ignored<InputLayout>,
    critic_layout: Ignored<InputLayout>,
}

impl<B: Backend> Model<B> {
    /// Build from a validated configuration; use [`ModelConfig::init`].
    pub(crate) fn new(config: &ModelConfig, key: RngKey, device: &B::Device) -> Self {
        let (actor_key, critic_key) = key.split();
        log::debug!(
            "building model: actor {} -> {}x{} mixtures, critic {} -> 1, hidden {} x depth {}",
            config.actor_input_size,
            config.num_actions,
            config.num_mixtures,
            config.critic_input_size,
            config.hidden_size,
            config.depth
        );

        Self {
            actor: Actor::new(config, actor_key, device),
            critic: Critic::new(config, critic_key, device),
            actor_layout: Ignored(config.actor_layout.clone()),
            critic_layout: Ignored(config.critic_layout.clone()),
        }
    }

    /// Zero carries for both networks.
    pub fn initial_carry(&self, batch_size: usize, device: &B::Device) -> ModelCarry<B> {
        ModelCarry::new(
            self.actor.initial_carry(batch_size, device),
            self.critic.initial_carry(batch_size, device),
        )
    }

    /// Flatten actor observation/command bundles: [batch, actor inputs].
    pub fn actor_input(
        &self,
        observations: &ChannelBundle,
        commands: &ChannelBundle,
        device: &B::Device,
    ) -> Result<Tensor<B, 2>> {
        self.actor_layout.to_tensor(observations, commands, device)
    }

    /// Flatten critic observation/command bundles: [batch, critic inputs].
    pub fn critic_input(
        &self,
        observations: &ChannelBundle,
        commands: &ChannelBundle,
        device: &B::Device,
    ) -> Result<Tensor<B, 2>> {
        self.critic_layout.to_tensor(observations, commands, device)
    }

    pub fn actor_layout(&self) -> &InputLayout {
        &self.actor_layout
    }

    pub fn critic_layout(&self) -> &InputLayout {
        &self.critic_layout
    }

    pub fn num_actions(&self) -> usize {
        self.actor.num_actions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::ChannelLayout;
    use crate::core::joints::RestPose;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_actor_and_critic_parameters_independent() {
        let device = Default::default();
        let layout = InputLayout::new(ChannelLayout::new().with_channel("obs", 4), ChannelLayout::new());
        let config = ModelConfig::new(layout.clone(), layout, RestPose::zeros(1))
            .with_hidden_size(4)
            .with_depth(1)
            .with_num_mixtures(1);
        let model = config.init::<B>(RngKey::new(0), &device).unwrap();

        // Same shapes, different draws
        let aw = model.actor.input_proj.weight.val().into_data().to_vec::<f32>().unwrap();
        let cw = model.critic.input_proj.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(aw.len(), cw.len());
        assert_ne!(aw, cw);
    }

    #[test]
    fn test_initial_carry_shapes() {
        let device = Default::default();
        let actor = InputLayout::new(ChannelLayout::new().with_channel("a", 2), ChannelLayout::new());
        let critic = InputLayout::new(ChannelLayout::new().with_channel("c", 5), ChannelLayout::new());
        let config = ModelConfig::new(actor, critic, RestPose::zeros(3))
            .with_hidden_size(6)
            .with_depth(2);
        let model = config.init::<B>(RngKey::new(1), &device).unwrap();

        let carry = model.initial_carry(4, &device);
        assert_eq!(carry.actor.state.dims(), [2, 4, 6]);
        assert_eq!(carry.critic.state.dims(), [2, 4, 6]);
        assert_eq!(model.num_actions(), 3);
    }
}
