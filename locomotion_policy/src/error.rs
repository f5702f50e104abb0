//! Error type shared by policy construction and evaluation.
//!
//! Every failure in this crate is a configuration or wiring defect between the
//! policy and its environment collaborator. Nothing here is retried; callers
//! are expected to surface the error and stop before a rollout begins.

use std::fmt;

/// Errors raised while building or evaluating the locomotion policy.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// A count parameter (hidden size, depth, mixtures, ...) must be positive.
    InvalidCount {
        field: &'static str,
        value: usize,
    },
    /// A float parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// The standard deviation bounds are inverted or collapsed.
    InvalidStdBounds { min_std: f32, max_std: f32 },
    /// A declared width disagrees with the width derived from a layout or tensor.
    WidthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A named channel required by a layout is absent from the bundle.
    MissingChannel { channel: String },
    /// A channel holds a number of values that is not `batch * width`.
    ChannelWidth {
        channel: String,
        expected: usize,
        actual: usize,
    },
    /// The same channel name appears twice in one layout.
    DuplicateChannel { channel: String },
    /// A joint has no actuator mapping in the robot metadata.
    MissingJointMetadata { joint: String },
    /// Two joints map onto the same actuator.
    DuplicateActuator { actuator_id: u32 },
    /// Batch sizes of tensors or bundles that must agree differ.
    BatchMismatch { expected: usize, actual: usize },
    /// The trajectory has no transitions.
    EmptyTrajectory,
    /// Reading tensor data back to the host failed.
    TensorData(String),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            PolicyError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            PolicyError::InvalidStdBounds { min_std, max_std } => {
                write!(
                    f,
                    "min_std ({}) must be positive and strictly below max_std ({})",
                    min_std, max_std
                )
            }
            PolicyError::WidthMismatch { what, expected, actual } => {
                write!(f, "{} width mismatch: expected {}, got {}", what, expected, actual)
            }
            PolicyError::MissingChannel { channel } => {
                write!(f, "missing channel '{}'", channel)
            }
            PolicyError::ChannelWidth { channel, expected, actual } => {
                write!(
                    f,
                    "channel '{}' holds {} values, expected {}",
                    channel, actual, expected
                )
            }
            PolicyError::DuplicateChannel { channel } => {
                write!(f, "channel '{}' appears more than once in the layout", channel)
            }
            PolicyError::MissingJointMetadata { joint } => {
                write!(f, "joint '{}' has no actuator metadata", joint)
            }
            PolicyError::DuplicateActuator { actuator_id } => {
                write!(f, "actuator {} is mapped by more than one joint", actuator_id)
            }
            PolicyError::BatchMismatch { expected, actual } => {
                write!(f, "batch size mismatch: expected {}, got {}", expected, actual)
            }
            PolicyError::EmptyTrajectory => write!(f, "trajectory has no transitions"),
            PolicyError::TensorData(e) => write!(f, "tensor readback failed: {}", e),
        }
    }
}

impl std::error::Error for PolicyError {}

impl From<burn::tensor::DataError> for PolicyError {
    fn from(e: burn::tensor::DataError) -> Self {
        PolicyError::TensorData(format!("{:?}", e))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PolicyError::InvalidStdBounds {
            min_std: 1.0,
            max_std: 0.5,
        };
        assert!(err.to_string().contains("min_std (1)"));

        let err = PolicyError::ChannelWidth {
            channel: "joint_position".into(),
            expected: 40,
            actual: 38,
        };
        assert_eq!(
            err.to_string(),
            "channel 'joint_position' holds 38 values, expected 40"
        );
    }
}
