//! Named observation and command channels, and the fixed order in which they
//! are concatenated into network inputs.
//!
//! The environment hands the policy a [`ChannelBundle`] per control step: a map
//! from channel name to a row-major `[batch, width]` block of floats. A
//! [`ChannelLayout`] selects a subset of those channels in a fixed order, and an
//! [`InputLayout`] appends a command layout to an observation layout. The same
//! layout object is used at rollout and training time, so the concatenation
//! order cannot drift between the two.

use std::collections::BTreeMap;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// One named channel of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub width: usize,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// Ordered selection of channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout {
    channels: Vec<ChannelSpec>,
}

impl ChannelLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a channel.
    pub fn with_channel(mut self, name: impl Into<String>, width: usize) -> Self {
        self.channels.push(ChannelSpec::new(name, width));
        self
    }

    pub fn channels(&self) -> &[ChannelSpec] {
        &self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Sum of channel widths.
    pub fn width(&self) -> usize {
        self.channels.iter().map(|c| c.width).sum()
    }

    /// Reject zero-width and repeated channels.
    pub fn validate(&self) -> Result<()> {
        for (i, spec) in self.channels.iter().enumerate() {
            if spec.width == 0 {
                return Err(PolicyError::InvalidCount {
                    field: "channel width",
                    value: 0,
                });
            }
            if self.channels[..i].iter().any(|c| c.name == spec.name) {
                return Err(PolicyError::DuplicateChannel {
                    channel: spec.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Concatenate the layout's channels into flat rows of `[batch, width]`.
    pub fn gather(&self, bundle: &ChannelBundle) -> Result<Vec<f32>> {
        let batch = bundle.batch_size();
        let width = self.width();
        let mut blocks = Vec::with_capacity(self.channels.len());
        for spec in &self.channels {
            blocks.push((spec.width, bundle.channel_checked(&spec.name, spec.width)?));
        }

        let mut rows = Vec::with_capacity(batch * width);
        for b in 0..batch {
            for (w, data) in &blocks {
                rows.extend_from_slice(&data[b * w..(b + 1) * w]);
            }
        }
        Ok(rows)
    }
}

/// Observation channels followed by command channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLayout {
    pub observations: ChannelLayout,
    pub commands: ChannelLayout,
}

impl InputLayout {
    pub fn new(observations: ChannelLayout, commands: ChannelLayout) -> Self {
        Self {
            observations,
            commands,
        }
    }

    /// Standard actor inputs for a legged robot with `num_joints` actuated joints.
    ///
    /// Joint positions, joint velocities and projected gravity, followed by
    /// IMU acceleration and gyroscope when `include_imu` is set. `commands` is
    /// appended unchanged.
    pub fn locomotion_actor(num_joints: usize, include_imu: bool, commands: ChannelLayout) -> Self {
        let mut observations = ChannelLayout::new()
            .with_channel("joint_position", num_joints)
            .with_channel("joint_velocity", num_joints)
            .with_channel("projected_gravity", 3);
        if include_imu {
            observations = observations
                .with_channel("imu_acc", 3)
                .with_channel("imu_gyro", 3);
        }
        Self::new(observations, commands)
    }

    /// Total network input width.
    pub fn width(&self) -> usize {
        self.observations.width() + self.commands.width()
    }

    pub fn validate(&self) -> Result<()> {
        self.observations.validate()?;
        self.commands.validate()?;
        if let Some(spec) = self
            .commands
            .channels()
            .iter()
            .find(|c| self.observations.channels().iter().any(|o| o.name == c.name))
        {
            return Err(PolicyError::DuplicateChannel {
                channel: spec.name.clone(),
            });
        }
        Ok(())
    }

    /// Fail unless the layout produces exactly `declared` inputs.
    pub fn check_width(&self, what: &'static str, declared: usize) -> Result<()> {
        let actual = self.width();
        if actual != declared {
            return Err(PolicyError::WidthMismatch {
                what,
                expected: declared,
                actual,
            });
        }
        Ok(())
    }

    /// Build the `[batch, width]` network input from the two bundles.
    pub fn to_tensor<B: Backend>(
        &self,
        observations: &ChannelBundle,
        commands: &ChannelBundle,
        device: &B::Device,
    ) -> Result<Tensor<B, 2>> {
        let batch = observations.batch_size();
        if !self.commands.is_empty() && commands.batch_size() != batch {
            return Err(PolicyError::BatchMismatch {
                expected: batch,
                actual: commands.batch_size(),
            });
        }

        let obs_rows = self.observations.gather(observations)?;
        let cmd_rows = self.commands.gather(commands)?;
        let obs_w = self.observations.width();
        let cmd_w = self.commands.width();

        let mut rows = Vec::with_capacity(batch * (obs_w + cmd_w));
        for b in 0..batch {
            rows.extend_from_slice(&obs_rows[b * obs_w..(b + 1) * obs_w]);
            if cmd_w > 0 {
                rows.extend_from_slice(&cmd_rows[b * cmd_w..(b + 1) * cmd_w]);
            }
        }

        Ok(Tensor::<B, 1>::from_floats(rows.as_slice(), device).reshape([batch, obs_w + cmd_w]))
    }
}

/// Named channels for a batch of environments.
///
/// Each channel holds `batch_size * width` floats, row-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelBundle {
    batch_size: usize,
    channels: BTreeMap<String, Vec<f32>>,
}

impl ChannelBundle {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, data: Vec<f32>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Vec<f32>) {
        self.channels.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn channel_checked(&self, name: &str, width: usize) -> Result<&[f32]> {
        let data = self.get(name).ok_or_else(|| PolicyError::MissingChannel {
            channel: name.to_string(),
        })?;
        let expected = self.batch_size * width;
        if data.len() != expected {
            return Err(PolicyError::ChannelWidth {
                channel: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}
