//! Model configuration.
//!
//! Hyperparameters live in one plain struct that is validated before any
//! parameter is allocated. A model built from an invalid configuration would
//! produce statistics of the wrong shape or degenerate distributions, so every
//! check here fails construction instead of being patched up later.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::core::bundle::{ChannelLayout, InputLayout};
use crate::core::joints::RestPose;
use crate::core::rng::RngKey;
use crate::error::{PolicyError, Result};
use crate::nn::projection::ProjectionInit;
use crate::policy::model::Model;

/// Standard deviation transform parameters.
///
/// `std = clamp((softplus(s) + min_std) * var_scale, min_std, max_std)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StdBounds {
    pub min_std: f32,
    pub max_std: f32,
    pub var_scale: f32,
}

impl Default for StdBounds {
    fn default() -> Self {
        Self {
            min_std: 0.001,
            max_std: 1.0,
            var_scale: 0.5,
        }
    }
}

impl StdBounds {
    pub fn new(min_std: f32, max_std: f32, var_scale: f32) -> Self {
        Self {
            min_std,
            max_std,
            var_scale,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_std.is_finite() && self.max_std.is_finite())
            || self.min_std <= 0.0
            || self.min_std >= self.max_std
        {
            return Err(PolicyError::InvalidStdBounds {
                min_std: self.min_std,
                max_std: self.max_std,
            });
        }
        if !self.var_scale.is_finite() || self.var_scale <= 0.0 {
            return Err(PolicyError::OutOfRange {
                field: "var_scale",
                value: self.var_scale,
                min: f32::MIN_POSITIVE,
                max: f32::MAX,
            });
        }
        Ok(())
    }
}

/// Configuration for the actor-critic [`Model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Declared actor input width.
    pub actor_input_size: usize,
    /// Declared critic input width (includes privileged state).
    pub critic_input_size: usize,
    /// Number of controlled joints.
    pub num_actions: usize,
    /// GRU hidden width shared by every layer.
    pub hidden_size: usize,
    /// Number of stacked GRU layers.
    pub depth: usize,
    /// Gaussian components per action dimension.
    pub num_mixtures: usize,
    pub std_bounds: StdBounds,
    /// Neutral joint angles added to every component mean.
    pub rest_pose: RestPose,
    /// Channels concatenated into the actor input.
    pub actor_layout: InputLayout,
    /// Channels concatenated into the critic input.
    pub critic_layout: InputLayout,
    /// Initialisation of the actor and critic output heads.
    pub output_init: ProjectionInit,
}

impl ModelConfig {
    /// Create a configuration whose widths are derived from the layouts and
    /// the rest pose.
    pub fn new(actor_layout: InputLayout, critic_layout: InputLayout, rest_pose: RestPose) -> Self {
        Self {
            actor_input_size: actor_layout.width(),
            critic_input_size: critic_layout.width(),
            num_actions: rest_pose.len(),
            hidden_size: 128,
            depth: 5,
            num_mixtures: 5,
            std_bounds: StdBounds::default(),
            rest_pose,
            actor_layout,
            critic_layout,
            output_init: ProjectionInit::default(),
        }
    }

    /// Declare the actor input width (checked against the layout).
    pub fn with_actor_input_size(mut self, width: usize) -> Self {
        self.actor_input_size = width;
        self
    }

    /// Declare the critic input width (checked against the layout).
    pub fn with_critic_input_size(mut self, width: usize) -> Self {
        self.critic_input_size = width;
        self
    }

    /// Declare the action width (checked against the rest pose).
    pub fn with_num_actions(mut self, num_actions: usize) -> Self {
        self.num_actions = num_actions;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_num_mixtures(mut self, num_mixtures: usize) -> Self {
        self.num_mixtures = num_mixtures;
        self
    }

    pub fn with_std_bounds(mut self, std_bounds: StdBounds) -> Self {
        self.std_bounds = std_bounds;
        self
    }

    pub fn with_output_init(mut self, init: ProjectionInit) -> Self {
        self.output_init = init;
        self
    }

    /// Width of the actor's raw output head: means, scales and logits.
    pub fn actor_output_size(&self) -> usize {
        3 * self.num_actions * self.num_mixtures
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - Widths, depth and mixture count must be > 0
    /// - `0 < min_std < max_std`, `var_scale > 0`
    /// - Rest pose length must equal `num_actions`
    /// - Layouts must be free of duplicates and match the declared widths
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("actor_input_size", self.actor_input_size),
            ("critic_input_size", self.critic_input_size),
            ("num_actions", self.num_actions),
            ("hidden_size", self.hidden_size),
            ("depth", self.depth),
            ("num_mixtures", self.num_mixtures),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(PolicyError::InvalidCount { field, value });
            }
        }

        self.std_bounds.validate()?;

        if self.rest_pose.len() != self.num_actions {
            return Err(PolicyError::WidthMismatch {
                what: "rest pose",
                expected: self.num_actions,
                actual: self.rest_pose.len(),
            });
        }

        self.actor_layout.validate()?;
        self.critic_layout.validate()?;
        self.actor_layout.check_width("actor input", self.actor_input_size)?;
        self.critic_layout.check_width("critic input", self.critic_input_size)?;

        Ok(())
    }

    /// Validate and build the model, drawing all parameters from `key`.
    pub fn init<B: Backend>(&self, key: RngKey, device: &B::Device) -> Result<Model<B>> {
        self.validate()?;
        if self.std_bounds.var_scale < 1.0 {
            log::debug!(
                "var_scale {} lowers the softplus floor below min_std; clamped at {}",
                self.std_bounds.var_scale,
                self.std_bounds.min_std
            );
        }
        Ok(Model::new(self, key, device))
    }
}

/// Critic layout built from the actor layout plus extra privileged channels.
pub fn privileged_layout(actor: &InputLayout, extra: &ChannelLayout) -> InputLayout {
    let mut observations = actor.observations.clone();
    for spec in extra.channels() {
        observations = observations.with_channel(spec.name.clone(), spec.width);
    }
    InputLayout::new(observations, actor.commands.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        let actor = InputLayout::locomotion_actor(
            4,
            false,
            ChannelLayout::new().with_channel("command", 2),
        );
        let critic = privileged_layout(&actor, &ChannelLayout::new().with_channel("base_height", 1));
        ModelConfig::new(actor, critic, RestPose::zeros(4))
            .with_hidden_size(8)
            .with_depth(2)
            .with_num_mixtures(3)
    }

    #[test]
    fn test_widths_derived_from_layouts() {
        let config = config();
        assert_eq!(config.actor_input_size, 4 + 4 + 3 + 2);
        assert_eq!(config.critic_input_size, config.actor_input_size + 1);
        assert_eq!(config.actor_output_size(), 3 * 4 * 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_declared_width_mismatch_fails() {
        let config = config().with_actor_input_size(51);
        assert!(matches!(
            config.validate(),
            Err(PolicyError::WidthMismatch { what: "actor input", expected: 51, .. })
        ));
    }

    #[test]
    fn test_inverted_std_bounds_fail() {
        let config = config().with_std_bounds(StdBounds::new(1.0, 1.0, 0.5));
        assert!(matches!(
            config.validate(),
            Err(PolicyError::InvalidStdBounds { .. })
        ));

        let config = self::config().with_std_bounds(StdBounds::new(0.0, 1.0, 0.5));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_var_scale_fails() {
        let config = config().with_std_bounds(StdBounds::new(0.01, 1.0, 0.0));
        assert!(matches!(
            config.validate(),
            Err(PolicyError::OutOfRange { field: "var_scale", .. })
        ));
    }

    #[test]
    fn test_zero_depth_fails() {
        assert_eq!(
            config().with_depth(0).validate(),
            Err(PolicyError::InvalidCount { field: "depth", value: 0 })
        );
    }

    #[test]
    fn test_rest_pose_must_match_actions() {
        let config = config().with_num_actions(5);
        assert!(matches!(
            config.validate(),
            Err(PolicyError::WidthMismatch { what: "rest pose", .. })
        ));
    }
}
