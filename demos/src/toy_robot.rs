//! Synthetic legged robot used by the demos.
//!
//! Joints track the commanded target with a first-order lag. Each environment
//! ends its episode after a fixed, environment-specific number of steps and is
//! then reset to the rest pose. Good enough to drive the sampler and the scan
//! end to end without a physics engine.

use burn::tensor::backend::Backend;
use locomotion_policy::{
    done_mask, privileged_layout, sample_action, ChannelBundle, ChannelLayout, InputLayout, Model,
    ModelCarry, Result, RngKey, Trajectory, Transition,
};

pub const NUM_JOINTS: usize = 20;
const TRACKING_GAIN: f32 = 0.2;
const DT: f32 = 0.02;
const NOMINAL_HEIGHT: f32 = 0.35;

pub struct ToyRobot {
    num_envs: usize,
    rest_pose: Vec<f32>,
    command: [f32; 2],
    positions: Vec<f32>,
    velocities: Vec<f32>,
    elapsed: Vec<usize>,
    episode_len: Vec<usize>,
}

impl ToyRobot {
    pub fn new(num_envs: usize, rest_pose: Vec<f32>, command: [f32; 2]) -> Self {
        let positions = (0..num_envs).flat_map(|_| rest_pose.iter().copied()).collect();
        Self {
            num_envs,
            command,
            positions,
            velocities: vec![0.0; num_envs * NUM_JOINTS],
            elapsed: vec![0; num_envs],
            episode_len: (0..num_envs).map(|env| 6 + 3 * env).collect(),
            rest_pose,
        }
    }

    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Actor observations, critic observations and commands.
    pub fn observe(&self) -> (ChannelBundle, ChannelBundle, ChannelBundle) {
        let mut gravity = Vec::with_capacity(self.num_envs * 3);
        let mut height = Vec::with_capacity(self.num_envs);
        for env in 0..self.num_envs {
            let tilt = self.deviation(env);
            gravity.extend_from_slice(&[tilt.sin(), 0.0, -tilt.cos()]);
            height.push(NOMINAL_HEIGHT * tilt.cos());
        }

        let observations = ChannelBundle::new(self.num_envs)
            .with_channel("joint_position", self.positions.clone())
            .with_channel("joint_velocity", self.velocities.clone())
            .with_channel("projected_gravity", gravity);
        let critic_observations = observations.clone().with_channel("base_height", height);
        let commands = ChannelBundle::new(self.num_envs).with_channel(
            "command",
            (0..self.num_envs).flat_map(|_| self.command).collect(),
        );

        (observations, critic_observations, commands)
    }

    /// Apply joint targets; returns the per-environment done flags.
    pub fn step(&mut self, targets: &[f32]) -> Vec<bool> {
        for (i, &target) in targets.iter().enumerate() {
            let delta = TRACKING_GAIN * (target - self.positions[i]);
            self.positions[i] += delta;
            self.velocities[i] = delta / DT;
        }

        let mut done = vec![false; self.num_envs];
        for env in 0..self.num_envs {
            self.elapsed[env] += 1;
            if self.elapsed[env] >= self.episode_len[env] {
                done[env] = true;
                self.reset(env);
            }
        }
        done
    }

    fn reset(&mut self, env: usize) {
        let joints = env * NUM_JOINTS..(env + 1) * NUM_JOINTS;
        self.positions[joints.clone()].copy_from_slice(&self.rest_pose);
        self.velocities[joints].iter_mut().for_each(|v| *v = 0.0);
        self.elapsed[env] = 0;
    }

    /// Mean absolute joint deviation from the rest pose, read as body tilt.
    fn deviation(&self, env: usize) -> f32 {
        let joints = &self.positions[env * NUM_JOINTS..(env + 1) * NUM_JOINTS];
        joints
            .iter()
            .zip(&self.rest_pose)
            .map(|(q, q0)| (q - q0).abs())
            .sum::<f32>()
            / NUM_JOINTS as f32
    }
}

/// Roll the policy forward for `steps` control steps, recording a trajectory.
///
/// Carries are reset wherever an episode ends, matching what the scan does
/// when it replays the trajectory.
pub fn collect<B: Backend>(
    model: &Model<B>,
    robot: &mut ToyRobot,
    steps: usize,
    key: RngKey,
    device: &B::Device,
) -> Result<Trajectory> {
    let mut carry: ModelCarry<B> = model.initial_carry(robot.num_envs(), device);
    let mut trajectory = Trajectory::default();

    for t in 0..steps {
        let (observations, critic_observations, commands) = robot.observe();
        let sample = sample_action(
            model,
            carry,
            &observations,
            &commands,
            key.fold_in(t as u64),
            false,
        )?;
        let (action, next_carry) = sample.into_parts()?;
        let done = robot.step(&action);

        carry = next_carry.reset_where(&done_mask::<B>(&done, device));
        trajectory.push(Transition {
            critic_commands: commands.clone(),
            observations,
            commands,
            critic_observations,
            action,
            done,
        });
    }

    Ok(trajectory)
}

/// Actor and critic layouts for the toy robot.
pub fn layouts() -> (InputLayout, InputLayout) {
    let actor = InputLayout::locomotion_actor(
        NUM_JOINTS,
        false,
        ChannelLayout::new().with_channel("command", 2),
    );
    let critic = privileged_layout(&actor, &ChannelLayout::new().with_channel("base_height", 1));
    (actor, critic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use locomotion_policy::{ModelConfig, RestPose};

    #[test]
    fn test_layouts_add_privileged_height() {
        let (actor, critic) = layouts();
        assert_eq!(actor.width(), 45);
        assert_eq!(critic.width(), 46);
    }

    #[test]
    fn test_collect_records_episode_ends() {
        let device = Default::default();
        let (actor, critic) = layouts();
        let model = ModelConfig::new(actor, critic, RestPose::zeros(NUM_JOINTS))
            .with_hidden_size(8)
            .with_depth(1)
            .with_num_mixtures(2)
            .init::<NdArray<f32>>(RngKey::new(0), &device)
            .unwrap();
        let mut robot = ToyRobot::new(2, vec![0.0; NUM_JOINTS], [0.5, 0.0]);

        let trajectory = collect(&model, &mut robot, 9, RngKey::new(1), &device).unwrap();
        assert_eq!(trajectory.len(), 9);
        // Env 0 ends every 6 steps, env 1 every 9
        assert_eq!(trajectory.transitions[5].done, vec![true, false]);
        assert_eq!(trajectory.transitions[8].done, vec![false, true]);
        assert_eq!(trajectory.num_dones(), 2);
    }
}
