// tests/router_tests.rs

use std::sync::Arc;

use armtrack_common::models::{ObjectInfo, RobotCommand};
use armtrack_common::traits::MessageBroker;
use armtrack_core::broker::LocalBroker;
use armtrack_core::router::{CommandRouter, RouterStats};
use armtrack_core::test_utils::{base_frame, ArmCall, RecordingArm, RecordingGripper, ScriptedFrameSource};
use armtrack_core::{ControllerConfig, Session, SessionState};

fn listening_session(arm: Arc<RecordingArm>, gripper: Arc<RecordingGripper>) -> Session {
    let mut config = ControllerConfig::default();
    config.grasp.pick_settle_ms = 0;
    config.grasp.place_settle_ms = 0;
    config.broker.poll_interval_ms = 10;
    Session::new(
        config,
        arm,
        Arc::new(ScriptedFrameSource::new(vec![]).with_base(base_frame())),
        gripper,
    )
}

fn pick_positions(arm: &RecordingArm) -> Vec<[f64; 3]> {
    // The first IK request of each grasp is the Approach pose.
    arm.calls()
        .iter()
        .filter_map(|c| match c {
            ArmCall::SolveIk(p) => Some(*p),
            _ => None,
        })
        .step_by(6)
        .collect()
}

#[test]
fn both_wire_variants_drive_a_grasp() {
    let arm = Arc::new(RecordingArm::new());
    let gripper = Arc::new(RecordingGripper::new());
    let mut session = listening_session(arm.clone(), gripper.clone());
    session.start().unwrap();

    let broker = LocalBroker::new();
    let channel = session.config().broker.command_channel.clone();
    let subscription = broker.subscribe(&channel).unwrap();

    let object_variant = RobotCommand::place(
        ObjectInfo {
            name: "apple".into(),
            inrange: true,
            position: [0.5, 0.1, 0.27],
        },
        ObjectInfo {
            name: "Palm".into(),
            inrange: true,
            position: [0.2, -0.3, 0.3],
        },
    )
    .to_json()
    .unwrap();

    for payload in [
        r#"{"function_name": "grab_object", "position": [0.596527, 0.047547, 0.27]}"#,
        object_variant.as_str(),
        r#"{"function_name": "noop"}"#,
        r#"{"function_name": "grab_object""#,
    ] {
        assert_eq!(broker.publish(&channel, payload).unwrap(), 1);
    }
    broker.close();

    let router = CommandRouter::from_config(session.config());
    let running = session.running_flag();
    let stats = router.serve(&mut session, &subscription, &running).unwrap();

    assert_eq!(
        stats,
        RouterStats {
            received: 4,
            executed: 2,
            aborted: 0,
            skipped: 1,
            noop: 1,
        }
    );
    assert_eq!(
        pick_positions(&arm),
        vec![[0.596527, 0.047547, 0.27], [0.5, 0.1, 0.27]]
    );
    assert_eq!(gripper.positions(), vec![20, 900, 20, 900]);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn out_of_range_and_unreachable_commands_do_not_stop_the_router() {
    let arm = Arc::new(RecordingArm::new().with_ik_failure_at(1));
    let gripper = Arc::new(RecordingGripper::new());
    let mut session = listening_session(arm.clone(), gripper.clone());
    session.start().unwrap();

    let broker = LocalBroker::new();
    let subscription = broker.subscribe("robot_command_channel").unwrap();
    let far = RobotCommand::place(
        ObjectInfo {
            name: "banana".into(),
            inrange: false,
            position: [1.5, 0.0, 0.27],
        },
        ObjectInfo {
            name: "Palm".into(),
            inrange: true,
            position: [0.2, -0.3, 0.3],
        },
    );
    broker
        .publish("robot_command_channel", &far.to_json().unwrap())
        .unwrap();
    broker
        .publish(
            "robot_command_channel",
            &RobotCommand::grab_at([0.4, 0.0, 0.2]).to_json().unwrap(),
        )
        .unwrap();
    broker.close();

    let router = CommandRouter::from_config(session.config());
    let running = session.running_flag();
    let stats = router.serve(&mut session, &subscription, &running).unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.aborted, 1);
    assert!(gripper.positions().is_empty());
    assert_eq!(session.state(), SessionState::Ready);
}
