//! Affine projection layer with reproducible initialisation.
//!
//! Weights are drawn from an explicit [`RngKey`] rather than the backend's
//! global generator, so two models built from the same key are identical.
//!
//! # Initialisation schemes
//!
//! - [`ProjectionInit::Uniform`]: `U(-1/√d_in, 1/√d_in)` for weight and bias
//! - [`ProjectionInit::Orthogonal`]: orthonormal rows/columns scaled by `gain`,
//!   zero bias. Useful on the output heads where a small gain (e.g. 0.01)
//!   keeps the initial policy close to the rest pose.

use burn::module::{Module, Param};
use burn::prelude::*;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::core::rng::RngKey;

/// Weight initialisation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectionInit {
    Uniform,
    Orthogonal { gain: f32 },
}

impl Default for ProjectionInit {
    fn default() -> Self {
        ProjectionInit::Uniform
    }
}

/// Configuration for [`Projection`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub bias: bool,
    pub init: ProjectionInit,
}

impl ProjectionConfig {
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            bias: true,
            init: ProjectionInit::default(),
        }
    }

    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_init(mut self, init: ProjectionInit) -> Self {
        self.init = init;
        self
    }

    /// Initialize the layer from `key`.
    pub fn init<B: Backend>(&self, key: RngKey, device: &B::Device) -> Projection<B> {
        let (weight_key, bias_key) = key.split();
        let (weight, bias) = match self.init {
            ProjectionInit::Uniform => {
                let bound = 1.0 / (self.input_size as f32).sqrt();
                (
                    uniform(self.output_size * self.input_size, bound, weight_key),
                    uniform(self.output_size, bound, bias_key),
                )
            }
            ProjectionInit::Orthogonal { gain } => (
                orthogonal(self.output_size, self.input_size, gain, weight_key),
                vec![0.0; self.output_size],
            ),
        };

        let weight = Tensor::<B, 1>::from_floats(weight.as_slice(), device)
            .reshape([self.output_size, self.input_size]);
        let bias = self
            .bias
            .then(|| Param::from_tensor(Tensor::<B, 1>::from_floats(bias.as_slice(), device)));

        Projection {
            weight: Param::from_tensor(weight),
            bias,
            input_size: self.input_size,
            output_size: self.output_size,
        }
    }
}

/// Affine map `x ↦ x Wᵀ + b` over the last axis.
#[derive(Module, Debug)]
pub struct Projection<B: Backend> {
    /// [output_size, input_size]
    pub weight: Param<Tensor<B, 2>>,
    pub bias: Option<Param<Tensor<B, 1>>>,
    #[module(skip)]
    input_size: usize,
    #[module(skip)]
    output_size: usize,
}

impl<B: Backend> Projection<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let projected = input.matmul(self.weight.val().transpose());
        match &self.bias {
            None => projected,
            Some(bias) => projected + bias.val().unsqueeze_dim(0),
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }
}

fn uniform(n: usize, bound: f32, key: RngKey) -> Vec<f32> {
    let mut rng = key.rng();
    (0..n).map(|_| rng.gen_range(-bound..=bound)).collect()
}

/// Row-major [rows, cols] matrix with orthonormal columns (rows >= cols) or
/// orthonormal rows (rows < cols), scaled by `gain`.
///
/// Modified Gram-Schmidt over Gaussian vectors; the vectors being
/// orthogonalised are the shorter dimension of the matrix.
fn orthogonal(rows: usize, cols: usize, gain: f32, key: RngKey) -> Vec<f32> {
    let tall = rows >= cols;
    let (n_vecs, len) = if tall { (cols, rows) } else { (rows, cols) };

    let mut rng = key.rng();
    let mut basis: Vec<Vec<f32>> = Vec::with_capacity(n_vecs);
    while basis.len() < n_vecs {
        let mut v: Vec<f32> = (0..len).map(|_| rng.sample::<f32, _>(StandardNormal)).collect();
        for u in &basis {
            let dot: f32 = v.iter().zip(u).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(u).for_each(|(a, b)| *a -= dot * b);
        }
        let norm = v.iter().map(|a| a * a).sum::<f32>().sqrt();
        // Linearly dependent draw, try again
        if norm > 1e-6 {
            v.iter_mut().for_each(|a| *a /= norm);
            basis.push(v);
        }
    }

    let mut out = vec![0.0; rows * cols];
    for (i, v) in basis.iter().enumerate() {
        for (j, &x) in v.iter().enumerate() {
            let (r, c) = if tall { (j, i) } else { (i, j) };
            out[r * cols + c] = gain * x;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_projection_forward_shape() {
        let device = Default::default();
        let layer: Projection<TestBackend> = ProjectionConfig::new(4, 3).init(RngKey::new(0), &device);

        let output = layer.forward(Tensor::ones([2, 4], &device));
        assert_eq!(output.dims(), [2, 3]);
    }

    #[test]
    fn test_same_key_same_weights() {
        let device = Default::default();
        let config = ProjectionConfig::new(5, 7);
        let a: Projection<TestBackend> = config.init(RngKey::new(9), &device);
        let b: Projection<TestBackend> = config.init(RngKey::new(9), &device);

        let wa = a.weight.val().into_data().to_vec::<f32>().unwrap();
        let wb = b.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(wa, wb);
    }

    #[test]
    fn test_uniform_within_bound() {
        let bound = 1.0 / 16f32.sqrt();
        assert!(uniform(256, bound, RngKey::new(1))
            .iter()
            .all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_orthogonal_columns() {
        let (rows, cols) = (6, 4);
        let w = orthogonal(rows, cols, 1.0, RngKey::new(2));
        for i in 0..cols {
            for j in 0..cols {
                let dot: f32 = (0..rows).map(|r| w[r * cols + i] * w[r * cols + j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "col {} . col {} = {}", i, j, dot);
            }
        }
    }

    #[test]
    fn test_orthogonal_wide_rows_scaled_by_gain() {
        let (rows, cols) = (2, 5);
        let w = orthogonal(rows, cols, 0.5, RngKey::new(3));
        for r in 0..rows {
            let norm: f32 = w[r * cols..(r + 1) * cols].iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_orthogonal_init_zero_bias() {
        let device = Default::default();
        let layer: Projection<TestBackend> = ProjectionConfig::new(3, 3)
            .with_init(ProjectionInit::Orthogonal { gain: 0.01 })
            .init(RngKey::new(4), &device);
        let output = layer.forward(Tensor::zeros([1, 3], &device));
        let values = output.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }
}
