//! Explicit random-source tokens.
//!
//! Nothing in the policy draws from global random state. Every call that needs
//! randomness receives an [`RngKey`], and sub-keys are derived from a parent
//! key deterministically, so replaying a rollout with the same root key
//! reproduces every draw.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Smallest uniform value handed to `ln`, keeps Gumbel noise finite.
const UNIFORM_EPS: f32 = 1e-7;

/// Separates the `fold_in` derivation stream from `split`.
const FOLD_TAG: u64 = 0x9E37_79B9_7F4A_7C15;

/// Random-source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RngKey(pub u64);

impl RngKey {
    /// Create a root key from a seed.
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Derive two independent child keys.
    pub fn split(self) -> (RngKey, RngKey) {
        let mut rng = fastrand::Rng::with_seed(self.0);
        (RngKey(rng.u64(..)), RngKey(rng.u64(..)))
    }

    /// Derive `n` child keys.
    pub fn split_n(self, n: usize) -> Vec<RngKey> {
        let mut rng = fastrand::Rng::with_seed(self.0);
        (0..n).map(|_| RngKey(rng.u64(..))).collect()
    }

    /// Derive a key bound to `data` (e.g. a step or environment index).
    pub fn fold_in(self, data: u64) -> RngKey {
        let base = fastrand::Rng::with_seed(self.0 ^ FOLD_TAG).u64(..);
        let mut rng = fastrand::Rng::with_seed(base ^ data.rotate_left(32));
        RngKey(rng.u64(..))
    }

    /// Seeded generator for the draws made with this key.
    pub fn rng(self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }

    /// `n` standard normal draws.
    pub fn normal(self, n: usize) -> Vec<f32> {
        let mut rng = self.rng();
        (0..n).map(|_| rng.sample::<f32, _>(StandardNormal)).collect()
    }

    /// `n` standard Gumbel draws, `-ln(-ln(u))` with `u` kept inside (0, 1).
    pub fn gumbel(self, n: usize) -> Vec<f32> {
        let mut rng = self.rng();
        (0..n)
            .map(|_| {
                let u: f32 = rng.gen::<f32>().clamp(UNIFORM_EPS, 1.0 - UNIFORM_EPS);
                -(-u.ln()).ln()
            })
            .collect()
    }
}

impl From<u64> for RngKey {
    fn from(seed: u64) -> Self {
        Self(seed)
    }
}
