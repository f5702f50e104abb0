//! Data types shared by the networks and the PPO scan: channel bundles,
//! recurrent carries, recorded transitions, rest pose and random keys.

pub mod bundle;
pub mod carry;
pub mod joints;
pub mod rng;
pub mod transition;

pub use bundle::{ChannelBundle, ChannelLayout, ChannelSpec, InputLayout};
pub use carry::{done_mask, ModelCarry, RecurrentCarry};
pub use joints::{JointBias, JointMetadata, RestPose};
pub use rng::RngKey;
pub use transition::{Trajectory, Transition};
