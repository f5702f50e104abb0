//! Network building blocks: affine projections and the GRU cell stack.
//!
//! - [`projection`]: linear layer with keyed, reproducible initialisation
//! - [`gru`]: single-step GRU cell
//! - [`stack`]: depth-`n` GRU stack operating on a [`RecurrentCarry`](crate::core::RecurrentCarry)

pub mod gru;
pub mod projection;
pub mod stack;

pub use gru::{GruCell, GruCellConfig};
pub use projection::{Projection, ProjectionConfig, ProjectionInit};
pub use stack::{RecurrentStack, RecurrentStackConfig};
