//! # Locomotion Policy: recurrent mixture actor-critic for PPO
//!
//! Policy core for training a legged robot's joint-position controller with
//! PPO. An actor maps proprioceptive observations and a locomotion command to
//! a per-joint mixture of Gaussians; a critic with privileged inputs estimates
//! values. Both carry GRU state across control steps.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Model                             │
//! │  ┌───────────────────────────┐  ┌─────────────────────────┐  │
//! │  │ Actor                     │  │ Critic                  │  │
//! │  │ proj ─► GRU×depth ─► head │  │ proj ─► GRU×depth ─► v  │  │
//! │  │          carry            │  │          carry          │  │
//! │  └─────────────┬─────────────┘  └────────────┬────────────┘  │
//! └────────────────┼─────────────────────────────┼───────────────┘
//!                  ▼                             ▼
//!     MixtureOfGaussians (+ rest pose)        value
//!                  │
//!     rollout: sample_action          training: fold_trajectory
//!                                     (log-probs, values, resets)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use locomotion_policy::{ChannelLayout, InputLayout, ModelConfig, RestPose, RngKey};
//!
//! let actor = InputLayout::locomotion_actor(20, false, ChannelLayout::new().with_channel("command", 2));
//! let config = ModelConfig::new(actor.clone(), actor, RestPose::zeros(20));
//! let model = config.init::<B>(RngKey::new(0), &device)?;
//!
//! let carry = model.initial_carry(num_envs, &device);
//! let sample = sample_action(&model, carry, &obs, &cmd, key, false)?;
//! let (carry, stats) = fold_trajectory(&model, start_carry, &trajectory, &keys)?;
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod nn;
pub mod policy;
pub mod ppo;

pub use config::{privileged_layout, ModelConfig, StdBounds};
pub use self::core::{
    done_mask, ChannelBundle, ChannelLayout, ChannelSpec, InputLayout, JointBias, JointMetadata,
    ModelCarry, RecurrentCarry, RestPose, RngKey, Trajectory, Transition,
};
pub use error::{PolicyError, Result};
pub use nn::{GruCell, GruCellConfig, Projection, ProjectionConfig, ProjectionInit, RecurrentStack};
pub use policy::{Actor, Critic, MixtureOfGaussians, Model};
pub use ppo::{
    fold_trajectory, fold_trajectory_with_key, ppo_step, sample_action, ActionSample,
    PpoStatistics, TrajectoryStatistics,
};
