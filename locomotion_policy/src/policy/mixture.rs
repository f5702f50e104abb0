//! Per-dimension mixture of univariate Gaussians.
//!
//! Each action dimension `a` of each environment `b` has its own mixture of `M`
//! components with means `μ[b, a, m]`, standard deviations `σ[b, a, m]` and
//! unnormalised logits `ℓ[b, a, m]`:
//!
//! ```text
//! p(x_a) = Σ_m softmax(ℓ)_m · N(x_a; μ_m, σ_m)
//! ```
//!
//! Dimensions are independent, so the joint log-probability of an action vector
//! is the sum of per-dimension log-probabilities.
//!
//! # Sampling
//!
//! The component is chosen with the Gumbel-max trick (`argmax(ℓ + g)`) and a
//! Gaussian draw is taken from it. Both noise blocks come from the caller's
//! [`RngKey`], so a replayed key yields the same action.

use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::core::rng::RngKey;

/// ln(2π)
const LOG_2PI: f32 = 1.837_877_1;

/// Mixture-of-Gaussians action distribution for a batch of environments.
#[derive(Debug, Clone)]
pub struct MixtureOfGaussians<B: Backend> {
    /// Component means [batch, num_actions, num_mixtures]
    pub means: Tensor<B, 3>,
    /// Component standard deviations [batch, num_actions, num_mixtures]
    pub stds: Tensor<B, 3>,
    /// Unnormalised mixture logits [batch, num_actions, num_mixtures]
    pub logits: Tensor<B, 3>,
}

impl<B: Backend> MixtureOfGaussians<B> {
    pub fn new(means: Tensor<B, 3>, stds: Tensor<B, 3>, logits: Tensor<B, 3>) -> Self {
        Self {
            means,
            stds,
            logits,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.means.dims()[0]
    }

    pub fn num_actions(&self) -> usize {
        self.means.dims()[1]
    }

    pub fn num_mixtures(&self) -> usize {
        self.means.dims()[2]
    }

    /// Normalised component weights.
    pub fn mixture_weights(&self) -> Tensor<B, 3> {
        softmax(self.logits.clone(), 2)
    }

    /// Mean of the highest-weight component per dimension: [batch, num_actions].
    pub fn mode(&self) -> Tensor<B, 2> {
        let [batch, actions, _] = self.means.dims();
        let best = self.logits.clone().argmax(2);
        self.means.clone().gather(2, best).reshape([batch, actions])
    }

    /// Expected value of the mixture: [batch, num_actions].
    pub fn mean(&self) -> Tensor<B, 2> {
        let [batch, actions, _] = self.means.dims();
        (self.mixture_weights() * self.means.clone())
            .sum_dim(2)
            .reshape([batch, actions])
    }

    /// Draw one action per environment: [batch, num_actions].
    pub fn sample(&self, key: RngKey) -> Tensor<B, 2> {
        let [batch, actions, mixtures] = self.means.dims();
        let device = self.means.device();
        let (component_key, noise_key) = key.split();

        let gumbel = Tensor::<B, 1>::from_floats(
            component_key.gumbel(batch * actions * mixtures).as_slice(),
            &device,
        )
        .reshape([batch, actions, mixtures]);
        let component = (self.logits.clone() + gumbel).argmax(2);

        let mu = self.means.clone().gather(2, component.clone());
        let sigma = self.stds.clone().gather(2, component);
        let eps = Tensor::<B, 1>::from_floats(noise_key.normal(batch * actions).as_slice(), &device)
            .reshape([batch, actions, 1]);

        (mu + sigma * eps).reshape([batch, actions])
    }

    /// Per-dimension log-probability of `action` [batch, num_actions].
    pub fn log_prob(&self, action: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, actions, mixtures] = self.means.dims();
        let x = action
            .reshape([batch, actions, 1])
            .expand([batch, actions, mixtures]);

        let z = (x - self.means.clone()) / self.stds.clone();
        let component_log_prob = z.powf_scalar(2.0) * (-0.5) - self.stds.clone().log() - 0.5 * LOG_2PI;
        let weighted = log_softmax(self.logits.clone(), 2) + component_log_prob;

        log_sum_exp(weighted).reshape([batch, actions])
    }

    /// Log-probability of the whole action vector: [batch].
    pub fn joint_log_prob(&self, action: Tensor<B, 2>) -> Tensor<B, 1> {
        let batch = self.batch_size();
        self.log_prob(action).sum_dim(1).reshape([batch])
    }

    /// Single-sample Monte-Carlo entropy estimate per environment: [batch].
    ///
    /// Mixtures have no closed-form entropy.
    pub fn entropy_estimate(&self, key: RngKey) -> Tensor<B, 1> {
        let sample = self.sample(key);
        -self.joint_log_prob(sample)
    }
}

/// Numerically stable log-sum-exp over the last axis, keeping it as size 1.
fn log_sum_exp<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let dims = x.dims();
    let max = x.clone().max_dim(2).detach();
    let shifted = x - max.clone().expand(dims);
    max + shifted.exp().sum_dim(2).log()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn single_component(mean: f32, std: f32, batch: usize, actions: usize) -> MixtureOfGaussians<B> {
        let device = Default::default();
        MixtureOfGaussians::new(
            Tensor::ones([batch, actions, 1], &device) * mean,
            Tensor::ones([batch, actions, 1], &device) * std,
            Tensor::zeros([batch, actions, 1], &device),
        )
    }

    #[test]
    fn test_single_component_matches_gaussian() {
        let device = Default::default();
        let dist = single_component(0.5, 2.0, 1, 1);
        let x = Tensor::<B, 2>::from_floats([[1.5]], &device);

        let lp = dist.log_prob(x).into_data().to_vec::<f32>().unwrap()[0];
        let z: f32 = (1.5 - 0.5) / 2.0;
        let expected = -0.5 * z * z - 2f32.ln() - 0.5 * LOG_2PI;
        assert!((lp - expected).abs() < 1e-5, "{} vs {}", lp, expected);
    }

    #[test]
    fn test_identical_components_equal_single() {
        let device = Default::default();
        let twin = MixtureOfGaussians::<B>::new(
            Tensor::ones([1, 2, 3], &device) * 0.2,
            Tensor::ones([1, 2, 3], &device) * 0.7,
            Tensor::from_floats([[[0.0, 3.0, -1.0], [1.0, 1.0, 1.0]]], &device),
        );
        let single = single_component(0.2, 0.7, 1, 2);
        let x = Tensor::<B, 2>::from_floats([[0.9, -0.4]], &device);

        let a = twin.log_prob(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = single.log_prob(x).into_data().to_vec::<f32>().unwrap();
        for (a, b) in a.iter().zip(&b) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mode_picks_highest_logit_component() {
        let device = Default::default();
        let dist = MixtureOfGaussians::<B>::new(
            Tensor::from_floats([[[-1.0, 2.0], [5.0, 7.0]]], &device),
            Tensor::ones([1, 2, 2], &device),
            Tensor::from_floats([[[0.0, 1.0], [4.0, -4.0]]], &device),
        );
        let mode = dist.mode().into_data().to_vec::<f32>().unwrap();
        assert_eq!(mode, vec![2.0, 5.0]);
    }

    #[test]
    fn test_mean_weights_components() {
        let device = Default::default();
        let dist = MixtureOfGaussians::<B>::new(
            Tensor::from_floats([[[0.0, 2.0]]], &device),
            Tensor::ones([1, 1, 2], &device),
            Tensor::zeros([1, 1, 2], &device),
        );
        let mean = dist.mean().into_data().to_vec::<f32>().unwrap();
        assert!((mean[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_replays_with_same_key() {
        let device = Default::default();
        let dist = MixtureOfGaussians::<B>::new(
            Tensor::zeros([4, 3, 2], &device),
            Tensor::ones([4, 3, 2], &device),
            Tensor::zeros([4, 3, 2], &device),
        );
        let a = dist.sample(RngKey::new(5)).into_data().to_vec::<f32>().unwrap();
        let b = dist.sample(RngKey::new(5)).into_data().to_vec::<f32>().unwrap();
        let c = dist.sample(RngKey::new(6)).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_joint_log_prob_sums_dimensions() {
        let device = Default::default();
        let dist = single_component(0.0, 1.0, 2, 3);
        let x = Tensor::<B, 2>::zeros([2, 3], &device);

        let joint = dist.joint_log_prob(x).into_data().to_vec::<f32>().unwrap();
        let expected = 3.0 * (-0.5 * LOG_2PI);
        assert_eq!(joint.len(), 2);
        assert!(joint.iter().all(|j| (j - expected).abs() < 1e-5));
    }

    #[test]
    fn test_entropy_estimate_finite() {
        let dist = single_component(0.0, 0.3, 8, 4);
        let h = dist.entropy_estimate(RngKey::new(1)).into_data().to_vec::<f32>().unwrap();
        assert!(h.iter().all(|v| v.is_finite()));
    }
}
