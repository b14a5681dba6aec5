use std::fmt;

use serde::{Deserialize, Serialize};

pub const JOINT_COUNT: usize = 6;

/// Joint configuration in radians, base joint first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointAngles(pub [f64; JOINT_COUNT]);

impl JointAngles {
    pub fn zeros() -> Self {
        Self([0.0; JOINT_COUNT])
    }
}

/// Per-joint velocity/acceleration caps applied while connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub max_velocity: [f64; JOINT_COUNT],
    pub max_acceleration: [f64; JOINT_COUNT],
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            max_velocity: [20.0; JOINT_COUNT],
            max_acceleration: [17.308779 / 2.5; JOINT_COUNT],
        }
    }
}

/// State reported by the robot controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    Idle,
    Running,
    Paused,
    Stopped,
    Error,
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RobotState::Idle => "idle",
            RobotState::Running => "running",
            RobotState::Paused => "paused",
            RobotState::Stopped => "stopped",
            RobotState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Busy state of the single motion channel into the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Moving,
}
