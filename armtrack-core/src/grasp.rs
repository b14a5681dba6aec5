// File: armtrack-core/src/grasp.rs
//! Pick-and-place sequencer.
//!
//! A grasp is a fixed list of steps. Each step may move the arm to a pose
//! (IK relative to the current joints, then one joint move), may drive the
//! gripper, and then waits a settle delay. There is no sensing feedback; a
//! grasp is correct when the steps run in order and an unreachable pose halts
//! the sequence before any later step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use armtrack_common::models::{GraspStepKind, GripperAction, RobotPose};
use armtrack_common::traits::{Gripper, RobotArm};
use crate::config::GraspConfig;
use crate::motion::{guarded_move, solve_pose, MotionFlag, RunningFlag};
use crate::Error;

const SETTLE_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq)]
pub struct GraspStep {
    pub kind: GraspStepKind,
    pub pose: Option<RobotPose>,
    pub gripper: Option<GripperAction>,
    pub settle: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraspPlan {
    steps: Vec<GraspStep>,
}

impl GraspPlan {
    /// Pick at `pick`, drop at `place`, park at `home`.
    pub fn standard(pick: RobotPose, place: RobotPose, home: RobotPose, cfg: &GraspConfig) -> Self {
        let pick_settle = Duration::from_millis(cfg.pick_settle_ms);
        let place_settle = Duration::from_millis(cfg.place_settle_ms);
        let above_place = place.lifted(cfg.transit_delta);

        let step = |kind, pose, gripper, settle| GraspStep {
            kind,
            pose,
            gripper,
            settle,
        };
        let steps = vec![
            step(GraspStepKind::Approach, Some(pick), None, pick_settle),
            step(GraspStepKind::Grip, None, Some(GripperAction::Close), pick_settle),
            step(GraspStepKind::Lift, Some(pick.lifted(cfg.lift_delta)), None, pick_settle),
            step(GraspStepKind::Transit, Some(above_place), None, place_settle),
            step(GraspStepKind::LowerAtTarget, Some(place), None, place_settle),
            step(GraspStepKind::Release, None, Some(GripperAction::Open), place_settle),
            step(GraspStepKind::Retreat, Some(above_place), None, place_settle),
            step(GraspStepKind::ReturnHome, Some(home), None, Duration::ZERO),
        ];
        Self { steps }
    }

    pub fn steps(&self) -> &[GraspStep] {
        &self.steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraspReport {
    pub completed: Vec<GraspStepKind>,
    pub elapsed: Duration,
}

pub struct GraspSequencer {
    robot: Arc<dyn RobotArm>,
    gripper: Arc<dyn Gripper>,
    motion: MotionFlag,
    running: RunningFlag,
    active: AtomicBool,
    close_position: u32,
    open_position: u32,
}

impl GraspSequencer {
    pub fn new(
        robot: Arc<dyn RobotArm>,
        gripper: Arc<dyn Gripper>,
        motion: MotionFlag,
        running: RunningFlag,
        cfg: &GraspConfig,
    ) -> Self {
        Self {
            robot,
            gripper,
            motion,
            running,
            active: AtomicBool::new(false),
            close_position: cfg.gripper_close,
            open_position: cfg.gripper_open,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Runs `plan` to completion. Fails with `GraspInProgress` if another
    /// grasp is running on this sequencer, `SolveFailure` on the first
    /// unreachable pose and `Interrupted` once the running flag clears.
    pub fn execute(&self, plan: &GraspPlan) -> Result<GraspReport, Error> {
        let _active = ActiveGrasp::acquire(&self.active).ok_or(Error::GraspInProgress)?;
        let started = Instant::now();
        let mut completed = Vec::with_capacity(plan.steps().len());

        info!("Grasp started ({} steps)", plan.steps().len());
        for step in plan.steps() {
            if !self.running.is_running() {
                warn!("Grasp interrupted before {}", step.kind);
                return Err(Error::Interrupted);
            }
            self.run_step(step)?;
            completed.push(step.kind);
            self.settle(step.settle);
        }

        let elapsed = started.elapsed();
        info!("Grasp finished in {:.2?}", elapsed);
        Ok(GraspReport { completed, elapsed })
    }

    fn run_step(&self, step: &GraspStep) -> Result<(), Error> {
        if let Some(pose) = &step.pose {
            let joints = solve_pose(self.robot.as_ref(), pose)?.ok_or_else(|| {
                warn!("Grasp aborted: {} pose is unreachable", step.kind);
                Error::SolveFailure { step: step.kind }
            })?;
            guarded_move(self.robot.as_ref(), &self.motion, &joints)?;
        }
        if let Some(action) = step.gripper {
            let value = match action {
                GripperAction::Close => self.close_position,
                GripperAction::Open => self.open_position,
            };
            self.gripper.set_position(value)?;
        }
        debug!("Grasp step {} done", step.kind);
        Ok(())
    }

    // Sleeps in slices so an operator stop is not held up by a long settle.
    fn settle(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= deadline || !self.running.is_running() {
                return;
            }
            thread::sleep(SETTLE_SLICE.min(deadline - now));
        }
    }
}

struct ActiveGrasp<'a>(&'a AtomicBool);

impl<'a> ActiveGrasp<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ActiveGrasp<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
