//! Recorded rollout steps as consumed by the PPO statistics scan.

use serde::{Deserialize, Serialize};

use super::bundle::ChannelBundle;
use crate::error::{PolicyError, Result};

/// One control step for a batch of environments.
///
/// Actor and critic read different channels; the critic additionally sees
/// privileged state that is unavailable on hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Actor observation channels.
    pub observations: ChannelBundle,
    /// Actor command channels (may be empty).
    pub commands: ChannelBundle,
    /// Critic observation channels.
    pub critic_observations: ChannelBundle,
    /// Critic command channels (may be empty).
    pub critic_commands: ChannelBundle,
    /// Action taken during rollout, [batch * num_actions] row-major.
    pub action: Vec<f32>,
    /// Episode ended at this step, one flag per environment.
    pub done: Vec<bool>,
}

impl Transition {
    /// Transition whose actor and critic read from the same bundles.
    pub fn shared(
        observations: ChannelBundle,
        commands: ChannelBundle,
        action: Vec<f32>,
        done: Vec<bool>,
    ) -> Self {
        Self {
            critic_observations: observations.clone(),
            critic_commands: commands.clone(),
            observations,
            commands,
            action,
            done,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.done.len()
    }

    /// Check the action and every bundle against the batch size.
    pub fn validate(&self, num_actions: usize) -> Result<()> {
        let batch = self.batch_size();
        for bundle in [&self.observations, &self.critic_observations] {
            if bundle.batch_size() != batch {
                return Err(PolicyError::BatchMismatch {
                    expected: batch,
                    actual: bundle.batch_size(),
                });
            }
        }
        for bundle in [&self.commands, &self.critic_commands] {
            if !bundle.is_empty() && bundle.batch_size() != batch {
                return Err(PolicyError::BatchMismatch {
                    expected: batch,
                    actual: bundle.batch_size(),
                });
            }
        }
        if self.action.len() != batch * num_actions {
            return Err(PolicyError::WidthMismatch {
                what: "recorded action",
                expected: batch * num_actions,
                actual: self.action.len(),
            });
        }
        Ok(())
    }
}

/// Temporally ordered transitions sharing one reset timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub transitions: Vec<Transition>,
}

impl Trajectory {
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Batch size shared by every transition.
    pub fn batch_size(&self) -> Result<usize> {
        let first = self
            .transitions
            .first()
            .ok_or(PolicyError::EmptyTrajectory)?
            .batch_size();
        for t in &self.transitions[1..] {
            if t.batch_size() != first {
                return Err(PolicyError::BatchMismatch {
                    expected: first,
                    actual: t.batch_size(),
                });
            }
        }
        Ok(first)
    }

    /// Number of episode ends recorded across all environments.
    pub fn num_dones(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| t.done.iter().filter(|&&d| d).count())
            .sum()
    }
}
