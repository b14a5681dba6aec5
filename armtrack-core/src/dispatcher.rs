// File: armtrack-core/src/dispatcher.rs
//! Motion dispatcher: target channel -> IK -> one joint move at a time.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use armtrack_common::models::Rpy;
use armtrack_common::traits::RobotArm;
use crate::channel::TargetReceiver;
use crate::motion::{guarded_move, solve_pose, MotionFlag, RunningFlag};
use crate::transform::Target;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Moved,
    /// Another motion held the flag; the target was dropped.
    SkippedBusy,
    NoSolution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub moved: u64,
    pub skipped_busy: u64,
    pub no_solution: u64,
    pub failed: u64,
}

pub struct MotionDispatcher {
    robot: Arc<dyn RobotArm>,
    motion: MotionFlag,
    rotation: Rpy,
    poll: Duration,
}

impl MotionDispatcher {
    pub fn new(robot: Arc<dyn RobotArm>, motion: MotionFlag, rotation: Rpy, poll: Duration) -> Self {
        Self {
            robot,
            motion,
            rotation,
            poll,
        }
    }

    /// Handles one target. Never blocks waiting for the motion flag.
    pub fn dispatch(&self, target: &Target) -> Result<DispatchOutcome, Error> {
        if self.motion.is_moving() {
            return Ok(DispatchOutcome::SkippedBusy);
        }

        let pose = target.pose(self.rotation);
        let Some(joints) = solve_pose(self.robot.as_ref(), &pose)? else {
            return Ok(DispatchOutcome::NoSolution);
        };

        match guarded_move(self.robot.as_ref(), &self.motion, &joints) {
            Ok(()) => Ok(DispatchOutcome::Moved),
            Err(Error::MotionBusy) => Ok(DispatchOutcome::SkippedBusy),
            Err(e) => Err(e),
        }
    }

    pub fn run(&self, receiver: &TargetReceiver, running: &RunningFlag) -> Result<DispatchStats, Error> {
        info!("Motion dispatcher started");
        let mut stats = DispatchStats::default();

        while running.is_running() {
            let target = match receiver.recv_timeout(self.poll) {
                Ok(Some(target)) => target,
                Ok(None) => continue,
                Err(Error::ChannelClosed) => {
                    debug!("Target channel closed; dispatcher exiting");
                    break;
                }
                Err(e) => return Err(e),
            };
            stats.received += 1;

            match self.dispatch(&target) {
                Ok(DispatchOutcome::Moved) => stats.moved += 1,
                Ok(DispatchOutcome::SkippedBusy) => stats.skipped_busy += 1,
                Ok(DispatchOutcome::NoSolution) => stats.no_solution += 1,
                Err(e) if e.is_connection() => return Err(e),
                Err(e) => {
                    stats.failed += 1;
                    warn!("Joint move failed: {e}");
                }
            }
        }

        info!(
            "Motion dispatcher stopped: {} received, {} moved, {} unreachable, {} failed",
            stats.received, stats.moved, stats.no_solution, stats.failed
        );
        Ok(stats)
    }
}
