// tests/grasp_tests.rs

use std::sync::Arc;

use parking_lot::Mutex;

use armtrack_common::models::GraspStepKind;
use armtrack_common::traits::Gripper;
use armtrack_core::grasp::GraspPlan;
use armtrack_core::test_utils::{base_frame, ArmCall, RecordingArm, ScriptedFrameSource};
use armtrack_core::{ControllerConfig, Error, Session, SessionState};

/// Records each gripper command together with how many joint moves the arm
/// had received at that moment.
struct TimelineGripper {
    arm: Arc<RecordingArm>,
    events: Mutex<Vec<(u32, usize)>>,
}

impl Gripper for TimelineGripper {
    fn set_position(&self, value: u32) -> Result<(), Error> {
        let moves = self.arm.count(|c| matches!(c, ArmCall::MoveJoint(_)));
        self.events.lock().push((value, moves));
        Ok(())
    }
}

fn grasp_session(arm: Arc<RecordingArm>) -> (Session, Arc<TimelineGripper>) {
    let gripper = Arc::new(TimelineGripper {
        arm: arm.clone(),
        events: Mutex::new(Vec::new()),
    });
    let mut config = ControllerConfig::default();
    config.grasp.pick_settle_ms = 0;
    config.grasp.place_settle_ms = 0;
    let session = Session::new(
        config,
        arm,
        Arc::new(ScriptedFrameSource::new(vec![]).with_base(base_frame())),
        gripper.clone(),
    );
    (session, gripper)
}

fn standard_plan(session: &Session) -> GraspPlan {
    let robot = &session.config().robot;
    let pick = robot.place_pose().lifted(-0.05);
    GraspPlan::standard(pick, robot.place_pose(), robot.home_pose(), &session.config().grasp)
}

#[test]
fn full_grasp_follows_the_fixed_order() {
    let arm = Arc::new(RecordingArm::new());
    let (mut session, gripper) = grasp_session(arm.clone());
    session.start().unwrap();

    let plan = standard_plan(&session);
    let report = session.run_grasp(&plan).unwrap();

    assert_eq!(report.completed, GraspStepKind::ORDER);
    assert_eq!(session.state(), SessionState::Ready);
    // Close after Approach and before Lift; open after LowerAtTarget and
    // before Retreat.
    assert_eq!(*gripper.events.lock(), vec![(20, 1), (900, 4)]);
    assert_eq!(arm.count(|c| matches!(c, ArmCall::MoveJoint(_))), 6);

    // Every move is preceded by its own IK request.
    let kinds: Vec<&str> = arm
        .calls()
        .iter()
        .filter_map(|c| match c {
            ArmCall::SolveIk(_) => Some("ik"),
            ArmCall::MoveJoint(_) => Some("move"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, ["ik", "move"].repeat(6));
}

#[test]
fn ik_failure_halts_immediately() {
    // Second IK request belongs to Lift.
    let arm = Arc::new(RecordingArm::new().with_ik_failure_at(2));
    let (mut session, gripper) = grasp_session(arm.clone());
    session.start().unwrap();

    let plan = standard_plan(&session);
    let err = session.run_grasp(&plan).unwrap_err();

    assert!(matches!(err, Error::SolveFailure { step: GraspStepKind::Lift }));
    assert_eq!(arm.count(|c| matches!(c, ArmCall::MoveJoint(_))), 1);
    assert_eq!(arm.count(|c| matches!(c, ArmCall::SolveIk(_))), 2);
    assert_eq!(*gripper.events.lock(), vec![(20, 1)]);
    assert_eq!(session.state(), SessionState::Ready);

    // The session stays usable.
    let report = session.run_grasp(&plan).unwrap();
    assert_eq!(report.completed.len(), 8);
}

#[test]
fn grasp_is_refused_before_start() {
    let arm = Arc::new(RecordingArm::new());
    let (mut session, _gripper) = grasp_session(arm.clone());
    let plan = standard_plan(&session);
    assert!(matches!(session.run_grasp(&plan), Err(Error::InvalidState { .. })));
    assert!(arm.calls().is_empty());
}
