//! Recurrent actor producing a mixture-of-Gaussians over joint targets.
//!
//! ```text
//! obs ─► input projection ─► GRU stack ─► output projection ─► [μ | s | ℓ]
//!                              ▲   │
//!                      carry ──┘   └──► next carry
//! ```
//!
//! The output head is split into three equal blocks of `A × M` values:
//! component means, pre-activation scales and mixture logits. Scales are
//! mapped to `[min_std, max_std]` and the rest pose is added to every
//! component mean, so the network learns a deviation from a known-good
//! standing posture.

use burn::module::{Ignored, Module};
use burn::tensor::activation::softplus;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::config::{ModelConfig, StdBounds};
use crate::core::carry::RecurrentCarry;
use crate::core::rng::RngKey;
use crate::nn::projection::{Projection, ProjectionConfig};
use crate::nn::stack::{RecurrentStack, RecurrentStackConfig};
use crate::policy::mixture::MixtureOfGaussians;

/// Fixed (non-learned) actor settings.
#[derive(Debug, Clone)]
pub struct ActorSettings {
    pub num_inputs: usize,
    pub num_actions: usize,
    pub num_mixtures: usize,
    pub std_bounds: StdBounds,
    pub rest_pose: Vec<f32>,
}

/// Recurrent mixture-policy network.
#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    pub(crate) input_proj: Projection<B>,
    pub(crate) rnn: RecurrentStack<B>,
    pub(crate) output_proj: Projection<B>,
    settings: Ignored<ActorSettings>,
}

impl<B: Backend> Actor<B> {
    /// Build from an already validated configuration.
    pub(crate) fn new(config: &ModelConfig, key: RngKey, device: &B::Device) -> Self {
        let keys = key.split_n(3);
        Self {
            input_proj: ProjectionConfig::new(config.actor_input_size, config.hidden_size)
                .init(keys[0], device),
            rnn: RecurrentStackConfig::new(config.hidden_size, config.depth).init(keys[1], device),
            output_proj: ProjectionConfig::new(config.hidden_size, config.actor_output_size())
                .with_init(config.output_init)
                .init(keys[2], device),
            settings: Ignored(ActorSettings {
                num_inputs: config.actor_input_size,
                num_actions: config.num_actions,
                num_mixtures: config.num_mixtures,
                std_bounds: config.std_bounds,
                rest_pose: config.rest_pose.angles().to_vec(),
            }),
        }
    }

    /// One control step for a batch of environments.
    ///
    /// `obs` is [batch, num_inputs]. Returns the action distribution and the
    /// candidate next carry.
    pub fn forward(
        &self,
        obs: Tensor<B, 2>,
        carry: &RecurrentCarry<B>,
    ) -> (MixtureOfGaussians<B>, RecurrentCarry<B>) {
        let x = self.input_proj.forward(obs);
        let (x, next_carry) = self.rnn.step(x, carry);
        let raw = self.output_proj.forward(x);
        (self.distribution(raw), next_carry)
    }

    /// Turn the raw output head [batch, 3·A·M] into a distribution.
    pub fn distribution(&self, raw: Tensor<B, 2>) -> MixtureOfGaussians<B> {
        let batch = raw.dims()[0];
        let (a, m) = (self.settings.num_actions, self.settings.num_mixtures);
        let block = a * m;
        let split = |i: usize| {
            raw.clone()
                .slice([0..batch, i * block..(i + 1) * block])
                .reshape([batch, a, m])
        };

        let means = split(0) + self.rest_pose_tensor(batch, &raw.device());
        let stds = scale_transform(split(1), &self.settings.std_bounds);
        let logits = split(2);

        MixtureOfGaussians::new(means, stds, logits)
    }

    fn rest_pose_tensor(&self, batch: usize, device: &B::Device) -> Tensor<B, 3> {
        let (a, m) = (self.settings.num_actions, self.settings.num_mixtures);
        Tensor::<B, 1>::from_floats(self.settings.rest_pose.as_slice(), device)
            .reshape([1, a, 1])
            .expand([batch, a, m])
    }

    /// Zero carry for `batch_size` environments.
    pub fn initial_carry(&self, batch_size: usize, device: &B::Device) -> RecurrentCarry<B> {
        self.rnn.initial_carry(batch_size, device)
    }

    pub fn settings(&self) -> &ActorSettings {
        &self.settings
    }

    pub fn num_inputs(&self) -> usize {
        self.settings.num_inputs
    }

    pub fn num_actions(&self) -> usize {
        self.settings.num_actions
    }
}

/// `clamp((softplus(s) + min_std) * var_scale, min_std, max_std)`.
///
/// The lower clamp is only active when `var_scale < 1`, where the softplus
/// floor `min_std * var_scale` would otherwise fall below `min_std`. Pre-scales
/// that land on it, roughly `s < ln(min_std * (1 / var_scale - 1))`, are pinned
/// at `min_std` and receive zero gradient. The same holds above `max_std`.
pub fn scale_transform<B: Backend, const D: usize>(
    pre_scale: Tensor<B, D>,
    bounds: &StdBounds,
) -> Tensor<B, D> {
    ((softplus(pre_scale, 1.0) + bounds.min_std) * bounds.var_scale)
        .clamp(bounds.min_std, bounds.max_std)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::{ChannelLayout, InputLayout};
    use crate::core::joints::RestPose;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn config(rest: Vec<f32>, mixtures: usize) -> ModelConfig {
        let layout = InputLayout::new(ChannelLayout::new().with_channel("obs", 6), ChannelLayout::new());
        ModelConfig::new(layout.clone(), layout, RestPose::from_angles(rest))
            .with_hidden_size(8)
            .with_depth(2)
            .with_num_mixtures(mixtures)
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let actor = Actor::<B>::new(&config(vec![0.0; 3], 4), RngKey::new(0), &device);
        let carry = actor.initial_carry(5, &device);

        let (dist, next) = actor.forward(Tensor::ones([5, 6], &device), &carry);
        assert_eq!(dist.means.dims(), [5, 3, 4]);
        assert_eq!(dist.stds.dims(), [5, 3, 4]);
        assert_eq!(dist.logits.dims(), [5, 3, 4]);
        assert_eq!(next.state.dims(), [2, 5, 8]);
    }

    #[test]
    fn test_split_blocks_in_order() {
        let device = Default::default();
        let actor = Actor::<B>::new(&config(vec![0.0; 2], 1), RngKey::new(0), &device);
        // [μ0 μ1 | s0 s1 | ℓ0 ℓ1]
        let raw = Tensor::<B, 2>::from_floats([[1.0, 2.0, 50.0, 50.0, 7.0, 8.0]], &device);
        let dist = actor.distribution(raw);

        assert_eq!(dist.means.into_data().to_vec::<f32>().unwrap(), vec![1.0, 2.0]);
        assert_eq!(dist.logits.into_data().to_vec::<f32>().unwrap(), vec![7.0, 8.0]);
        // Large pre-scale saturates at max_std
        assert_eq!(dist.stds.into_data().to_vec::<f32>().unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_rest_pose_added_to_every_component() {
        let device = Default::default();
        let rest = vec![0.25, -0.5];
        let actor = Actor::<B>::new(&config(rest.clone(), 3), RngKey::new(0), &device);
        let dist = actor.distribution(Tensor::zeros([1, 3 * 2 * 3], &device));

        let means = dist.means.into_data().to_vec::<f32>().unwrap();
        assert_eq!(means, vec![0.25, 0.25, 0.25, -0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_scale_transform_monotone_inside_bounds() {
        let device = Default::default();
        let bounds = StdBounds::new(0.01, 10.0, 1.0);
        let pre = Tensor::<B, 1>::from_floats([-1.0, 0.0, 1.0], &device);
        let stds = scale_transform(pre, &bounds).into_data().to_vec::<f32>().unwrap();

        assert!(stds[0] < stds[1] && stds[1] < stds[2]);
        let expected = (2f32.ln() + 0.01) * 1.0;
        assert!((stds[1] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_scale_transform_floor_has_zero_gradient() {
        type AB = burn::backend::Autodiff<NdArray<f32>>;
        let device = Default::default();
        let bounds = StdBounds::default();
        // ln(0.001) ≈ -6.9 is where the floor starts for var_scale 0.5
        let pre = Tensor::<AB, 1>::from_floats([-10.0, 0.0], &device).require_grad();

        let stds = scale_transform(pre.clone(), &bounds);
        let values = stds.clone().into_data().to_vec::<f32>().unwrap();
        assert_eq!(values[0], bounds.min_std);

        let grads = stds.sum().backward();
        let grad = pre.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
        assert_eq!(grad[0], 0.0);
        assert!(grad[1] > 0.0);
    }
}
