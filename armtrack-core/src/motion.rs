// File: armtrack-core/src/motion.rs
//! Shared flags and the IK-then-move primitive used by both the tracking
//! dispatcher and the grasp sequencer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use armtrack_common::models::{JointAngles, MotionState, RobotPose};
use armtrack_common::traits::RobotArm;
use crate::Error;

/// Process-wide cancellation flag. Starts armed; once stopped it stays stopped.
#[derive(Debug, Clone)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Idle/Moving gate in front of the robot's single motion channel.
///
/// Only the holder of a [`MotionGuard`] may command motion; the guard flips the
/// state back to Idle when dropped, including on an error return.
#[derive(Debug, Clone, Default)]
pub struct MotionFlag(Arc<AtomicBool>);

impl MotionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MotionState {
        if self.is_moving() {
            MotionState::Moving
        } else {
            MotionState::Idle
        }
    }

    pub fn is_moving(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Idle -> Moving, or `None` when someone else is already moving.
    pub fn try_begin(&self) -> Option<MotionGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| MotionGuard {
                flag: Arc::clone(&self.0),
            })
    }
}

#[derive(Debug)]
pub struct MotionGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for MotionGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Solves IK for `pose` relative to the robot's current joint waypoint.
pub fn solve_pose(robot: &dyn RobotArm, pose: &RobotPose) -> Result<Option<JointAngles>, Error> {
    let current = robot.current_joint_waypoint()?;
    let orientation = pose.rotation.to_quaternion();
    let solution = robot.solve_inverse_kinematics(&current, &pose.position, &orientation)?;
    if solution.is_none() {
        debug!(
            "No IK solution for ({:.4}, {:.4}, {:.4})",
            pose.position.x, pose.position.y, pose.position.z
        );
    }
    Ok(solution)
}

/// Issues one blocking joint move while holding the motion flag.
pub fn guarded_move(
    robot: &dyn RobotArm,
    motion: &MotionFlag,
    joints: &JointAngles,
) -> Result<(), Error> {
    let _guard = motion.try_begin().ok_or(Error::MotionBusy)?;
    robot.move_joint(joints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_idle_on_drop() {
        let flag = MotionFlag::new();
        assert_eq!(flag.state(), MotionState::Idle);
        {
            let _g = flag.try_begin().expect("idle flag must be acquirable");
            assert_eq!(flag.state(), MotionState::Moving);
            assert!(flag.try_begin().is_none());
        }
        assert_eq!(flag.state(), MotionState::Idle);
    }

    #[test]
    fn clones_share_state() {
        let flag = MotionFlag::new();
        let other = flag.clone();
        let _g = flag.try_begin().unwrap();
        assert!(other.is_moving());
    }

    #[test]
    fn running_flag_stays_stopped() {
        let running = RunningFlag::new();
        let seen_by_worker = running.clone();
        assert!(seen_by_worker.is_running());
        running.stop();
        assert!(!seen_by_worker.is_running());
    }
}
