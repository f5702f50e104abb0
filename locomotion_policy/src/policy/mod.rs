//! Actor, critic, their container and the action distribution.

pub mod actor;
pub mod critic;
pub mod mixture;
pub mod model;

pub use actor::{scale_transform, Actor, ActorSettings};
pub use critic::Critic;
pub use mixture::MixtureOfGaussians;
pub use model::Model;
