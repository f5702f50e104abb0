//! Rollout-time action selection.
//!
//! Only the actor runs here. The critic carry is handed back untouched so the
//! caller can keep threading one [`ModelCarry`] through the rollout loop.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::core::bundle::ChannelBundle;
use crate::core::carry::ModelCarry;
use crate::core::rng::RngKey;
use crate::error::{PolicyError, Result};
use crate::policy::model::Model;

/// Action chosen for a batch of environments.
#[derive(Debug, Clone)]
pub struct ActionSample<B: Backend> {
    /// Joint targets [batch, num_actions]
    pub action: Tensor<B, 2>,
    /// Log-probability of `action` under the current policy [batch]
    pub log_prob: Tensor<B, 1>,
    /// Carry for the next control step
    pub carry: ModelCarry<B>,
}

impl<B: Backend> ActionSample<B> {
    /// Actions as host memory, [batch * num_actions] row-major.
    pub fn action_vec(&self) -> Result<Vec<f32>> {
        Ok(self.action.clone().into_data().to_vec::<f32>()?)
    }

    /// Split into host actions and the next carry.
    pub fn into_parts(self) -> Result<(Vec<f32>, ModelCarry<B>)> {
        let action = self.action.into_data().to_vec::<f32>()?;
        Ok((action, self.carry))
    }
}

/// Pick an action for every environment in the batch.
///
/// With `deterministic` set the mode of the highest-weight component is
/// returned and `key` is not consumed; otherwise one draw is made from the
/// mixture using `key`.
pub fn sample_action<B: Backend>(
    model: &Model<B>,
    carry: ModelCarry<B>,
    observations: &ChannelBundle,
    commands: &ChannelBundle,
    key: RngKey,
    deterministic: bool,
) -> Result<ActionSample<B>> {
    let device = carry.actor.state.device();
    let batch = carry.batch_size();
    if observations.batch_size() != batch {
        return Err(PolicyError::BatchMismatch {
            expected: batch,
            actual: observations.batch_size(),
        });
    }

    let input = model.actor_input(observations, commands, &device)?;
    let (distribution, next_actor) = model.actor.forward(input, &carry.actor);

    let action = if deterministic {
        distribution.mode()
    } else {
        distribution.sample(key)
    };
    let log_prob = distribution.joint_log_prob(action.clone());

    Ok(ActionSample {
        action,
        log_prob,
        carry: ModelCarry::new(next_actor, carry.critic),
    })
}
