//! PPO plumbing: rollout-time sampling and the per-trajectory statistics scan.

pub mod sampler;
pub mod scan;


pub use sampler::{sample_action, ActionSample};
pub use scan::{
    fold_trajectory, fold_trajectory_with_key, ppo_step, PpoStatistics, TrajectoryStatistics,
};
