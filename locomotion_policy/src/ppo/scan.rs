//! PPO statistics scan.
//!
//! Re-runs the recurrent actor-critic over a recorded trajectory and yields,
//! for every step, the log-probability of the action that was actually taken
//! and the critic's value estimate. These are the inputs a PPO learner needs
//! to form importance ratios and value targets.
//!
//! # Carry resets
//!
//! After step `t`, environments whose `done[t]` flag is set continue from a
//! zero carry, exactly like a freshly reset episode during rollout. The reset
//! is a selection between the zero carry and the candidate carry, not a
//! branch, so every environment in the batch runs the same computation.
//!
//! A done flag on the last step only changes the carry handed back to the
//! caller for the next trajectory segment; no statistic of the current
//! segment depends on it.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::core::carry::{check_done_len, done_mask, ModelCarry};
use crate::core::rng::RngKey;
use crate::core::transition::{Trajectory, Transition};
use crate::error::{PolicyError, Result};
use crate::policy::model::Model;

/// Statistics for one step of a batch of environments.
#[derive(Debug, Clone)]
pub struct PpoStatistics<B: Backend> {
    /// Log-probability of the recorded action per dimension [batch, num_actions]
    pub log_probs: Tensor<B, 2>,
    /// Critic value estimate [batch]
    pub values: Tensor<B, 1>,
    /// Monte-Carlo entropy estimate drawn with the step's key [batch]
    pub entropy: Tensor<B, 1>,
}

impl<B: Backend> PpoStatistics<B> {
    /// Log-probability of the full action vector [batch].
    pub fn joint_log_probs(&self) -> Tensor<B, 1> {
        let batch = self.log_probs.dims()[0];
        self.log_probs.clone().sum_dim(1).reshape([batch])
    }
}

/// Statistics for a whole trajectory, time-major.
#[derive(Debug, Clone)]
pub struct TrajectoryStatistics<B: Backend> {
    /// [time, batch, num_actions]
    pub log_probs: Tensor<B, 3>,
    /// [time, batch]
    pub values: Tensor<B, 2>,
    /// [time, batch]
    pub entropy: Tensor<B, 2>,
}

impl<B: Backend> TrajectoryStatistics<B> {
    /// Stack per-step statistics along a new leading time axis.
    pub fn stack(steps: Vec<PpoStatistics<B>>) -> Self {
        let mut log_probs = Vec::with_capacity(steps.len());
        let mut values = Vec::with_capacity(steps.len());
        let mut entropy = Vec::with_capacity(steps.len());
        for step in steps {
            log_probs.push(step.log_probs);
            values.push(step.values);
            entropy.push(step.entropy);
        }
        Self {
            log_probs: Tensor::stack(log_probs, 0),
            values: Tensor::stack(values, 0),
            entropy: Tensor::stack(entropy, 0),
        }
    }

    pub fn len(&self) -> usize {
        self.values.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Joint log-probabilities [time, batch].
    pub fn joint_log_probs(&self) -> Tensor<B, 2> {
        let [time, batch, _] = self.log_probs.dims();
        self.log_probs.clone().sum_dim(2).reshape([time, batch])
    }
}

/// Evaluate one recorded step.
///
/// Runs the actor and critic from `carry`, scores the recorded action, and
/// returns the carry for the next step with done environments reset to zero.
pub fn ppo_step<B: Backend>(
    model: &Model<B>,
    carry: ModelCarry<B>,
    transition: &Transition,
    key: RngKey,
) -> Result<(ModelCarry<B>, PpoStatistics<B>)> {
    let device = carry.actor.state.device();
    let batch = carry.batch_size();
    let num_actions = model.num_actions();

    transition.validate(num_actions)?;
    check_done_len(&transition.done, batch)?;

    let actor_input = model.actor_input(&transition.observations, &transition.commands, &device)?;
    let (distribution, next_actor) = model.actor.forward(actor_input, &carry.actor);

    let action = Tensor::<B, 1>::from_floats(transition.action.as_slice(), &device)
        .reshape([batch, num_actions]);
    let log_probs = distribution.log_prob(action);
    let entropy = distribution.entropy_estimate(key);

    let critic_input = model.critic_input(
        &transition.critic_observations,
        &transition.critic_commands,
        &device,
    )?;
    let (values, next_critic) = model.critic.forward(critic_input, &carry.critic);

    let done = done_mask::<B>(&transition.done, &device);
    let next_carry = ModelCarry::new(next_actor, next_critic).reset_where(&done);

    Ok((
        next_carry,
        PpoStatistics {
            log_probs,
            values,
            entropy,
        },
    ))
}

/// Fold [`ppo_step`] over a trajectory, one key per step.
///
/// Steps are evaluated strictly in order; environments within a step are
/// evaluated together. Returns the final carry and time-major statistics.
pub fn fold_trajectory<B: Backend>(
    model: &Model<B>,
    initial_carry: ModelCarry<B>,
    trajectory: &Trajectory,
    keys: &[RngKey],
) -> Result<(ModelCarry<B>, TrajectoryStatistics<B>)> {
    let batch = trajectory.batch_size()?;
    if batch != initial_carry.batch_size() {
        return Err(PolicyError::BatchMismatch {
            expected: initial_carry.batch_size(),
            actual: batch,
        });
    }
    if keys.len() != trajectory.len() {
        return Err(PolicyError::WidthMismatch {
            what: "rng keys",
            expected: trajectory.len(),
            actual: keys.len(),
        });
    }

    let mut carry = initial_carry;
    let mut steps = Vec::with_capacity(trajectory.len());
    for (transition, &key) in trajectory.transitions.iter().zip(keys) {
        let (next, stats) = ppo_step(model, carry, transition, key)?;
        carry = next;
        steps.push(stats);
    }

    log::debug!(
        "folded {} steps over {} envs ({} episode ends)",
        trajectory.len(),
        batch,
        trajectory.num_dones()
    );

    Ok((carry, TrajectoryStatistics::stack(steps)))
}

/// [`fold_trajectory`] with per-step keys split from `key`.
pub fn fold_trajectory_with_key<B: Backend>(
    model: &Model<B>,
    initial_carry: ModelCarry<B>,
    trajectory: &Trajectory,
    key: RngKey,
) -> Result<(ModelCarry<B>, TrajectoryStatistics<B>)> {
    let keys = key.split_n(trajectory.len());
    fold_trajectory(model, initial_carry, trajectory, &keys)
}
