//! Neutral joint pose used as the actor's mean offset.
//!
//! The action vector is ordered like the robot's joint list. Each joint must be
//! backed by an actuator in the robot metadata; a joint without one would give
//! the policy an output nobody consumes, so it fails construction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// Neutral angle for one joint, in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointBias {
    pub name: String,
    pub neutral_position: f32,
}

impl JointBias {
    pub fn new(name: impl Into<String>, neutral_position: f32) -> Self {
        Self {
            name: name.into(),
            neutral_position,
        }
    }
}

/// Actuator metadata for one joint, as published by the robot description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMetadata {
    pub actuator_id: u32,
    /// Proportional gain, informational for the policy.
    pub kp: Option<f32>,
    /// Derivative gain, informational for the policy.
    pub kd: Option<f32>,
}

impl JointMetadata {
    pub fn new(actuator_id: u32) -> Self {
        Self {
            actuator_id,
            kp: None,
            kd: None,
        }
    }
}

/// Per-action-dimension neutral pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestPose {
    joint_names: Vec<String>,
    angles: Vec<f32>,
}

impl RestPose {
    /// Rest pose with anonymous joints, e.g. for tests or synthetic robots.
    pub fn from_angles(angles: Vec<f32>) -> Self {
        let joint_names = (0..angles.len()).map(|i| format!("joint_{}", i)).collect();
        Self {
            joint_names,
            angles,
        }
    }

    /// All-zero rest pose for `num_actions` joints.
    pub fn zeros(num_actions: usize) -> Self {
        Self::from_angles(vec![0.0; num_actions])
    }

    /// Build the rest pose from the joint list and the robot's actuator metadata.
    ///
    /// Action order follows `joints`.
    pub fn from_joint_metadata(
        joints: &[JointBias],
        metadata: &BTreeMap<String, JointMetadata>,
    ) -> Result<Self> {
        if joints.is_empty() {
            return Err(PolicyError::InvalidCount {
                field: "joints",
                value: 0,
            });
        }

        let mut seen = BTreeSet::new();
        for joint in joints {
            let meta = metadata
                .get(&joint.name)
                .ok_or_else(|| PolicyError::MissingJointMetadata {
                    joint: joint.name.clone(),
                })?;
            if !seen.insert(meta.actuator_id) {
                return Err(PolicyError::DuplicateActuator {
                    actuator_id: meta.actuator_id,
                });
            }
        }
        if metadata.len() > joints.len() {
            log::warn!(
                "{} actuators in metadata are not driven by the policy",
                metadata.len() - joints.len()
            );
        }

        Ok(Self {
            joint_names: joints.iter().map(|j| j.name.clone()).collect(),
            angles: joints.iter().map(|j| j.neutral_position).collect(),
        })
    }

    pub fn angles(&self) -> &[f32] {
        &self.angles
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Number of action dimensions.
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(names: &[(&str, u32)]) -> BTreeMap<String, JointMetadata> {
        names
            .iter()
            .map(|(n, id)| (n.to_string(), JointMetadata::new(*id)))
            .collect()
    }

    #[test]
    fn test_order_follows_joint_list() {
        let joints = vec![
            JointBias::new("right_knee", -0.7),
            JointBias::new("left_knee", 0.7),
        ];
        let meta = metadata(&[("left_knee", 1), ("right_knee", 2)]);

        let pose = RestPose::from_joint_metadata(&joints, &meta).unwrap();
        assert_eq!(pose.angles(), &[-0.7, 0.7]);
        assert_eq!(pose.joint_names()[0], "right_knee");
    }

    #[test]
    fn test_missing_metadata_fails() {
        let joints = vec![JointBias::new("left_hip_pitch", 0.3)];
        let meta = metadata(&[("right_hip_pitch", 3)]);
        assert_eq!(
            RestPose::from_joint_metadata(&joints, &meta),
            Err(PolicyError::MissingJointMetadata {
                joint: "left_hip_pitch".into()
            })
        );
    }

    #[test]
    fn test_shared_actuator_fails() {
        let joints = vec![JointBias::new("a", 0.0), JointBias::new("b", 0.0)];
        let meta = metadata(&[("a", 5), ("b", 5)]);
        assert_eq!(
            RestPose::from_joint_metadata(&joints, &meta),
            Err(PolicyError::DuplicateActuator { actuator_id: 5 })
        );
    }
}
