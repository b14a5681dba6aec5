// tests/tracking_tests.rs

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;

use armtrack_common::models::geometry::position;
use armtrack_common::models::{RobotBaseOrigin, RobotState, Rpy};
use armtrack_core::channel::{target_channel, ChannelPolicy};
use armtrack_core::dispatcher::MotionDispatcher;
use armtrack_core::motion::{MotionFlag, RunningFlag};
use armtrack_core::test_utils::{base_frame, hand_frame, ArmCall, RecordingArm, RecordingGripper, ScriptedFrameSource};
use armtrack_core::transform::CoordinateTransformer;
use armtrack_core::{ControllerConfig, Error, Session, SessionState};

fn tracking_session(arm: Arc<RecordingArm>, frames: ScriptedFrameSource) -> Session {
    let mut config = ControllerConfig::default();
    config.dispatch.poll_interval_ms = 20;
    config.session.monitor_interval_ms = 10;
    config.tracking.channel_policy = ChannelPolicy::Fifo;
    Session::new(
        config,
        arm,
        Arc::new(frames),
        Arc::new(RecordingGripper::new()),
    )
}

fn stop_after(running: RunningFlag, delay: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        running.stop();
    })
}

#[test]
fn hand_reading_reaches_the_robot_in_base_meters() {
    // Base origin is (120, 220, 55) mm.
    let frames = ScriptedFrameSource::new(vec![hand_frame([716.527, 267.547, 325.0])])
        .with_base(base_frame())
        .with_delay(Duration::from_millis(2));
    let arm = Arc::new(RecordingArm::new());
    let mut session = tracking_session(arm.clone(), frames);

    session.start().unwrap();
    session.calibrate().unwrap();
    let stopper = stop_after(session.running_flag(), Duration::from_millis(150));
    let report = session.run_tracking().unwrap();
    stopper.join().unwrap();

    let solved: Vec<[f64; 3]> = arm
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ArmCall::SolveIk(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(solved.len(), 1);
    assert_relative_eq!(solved[0][0], 0.596527, epsilon = 1e-9);
    assert_relative_eq!(solved[0][1], 0.047547, epsilon = 1e-9);
    assert_relative_eq!(solved[0][2], 0.47, epsilon = 1e-9);

    assert_eq!(report.dispatcher.map(|d| d.moved), Some(1));
    assert_eq!(report.producer.map(|p| p.published), Some(1));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn occluded_hand_never_moves_the_arm() {
    let frames = ScriptedFrameSource::new(vec![
        hand_frame([0.0, 0.0, 0.0]),
        hand_frame([0.0, 0.0, 0.0]),
    ])
    .with_base(base_frame())
    .with_delay(Duration::from_millis(2));
    let arm = Arc::new(RecordingArm::new());
    let mut session = tracking_session(arm.clone(), frames);

    session.start().unwrap();
    session.calibrate().unwrap();
    let stopper = stop_after(session.running_flag(), Duration::from_millis(80));
    session.run_tracking().unwrap();
    stopper.join().unwrap();

    assert_eq!(arm.count(|c| matches!(c, ArmCall::SolveIk(_) | ArmCall::MoveJoint(_))), 0);
}

#[test]
fn competing_dispatchers_never_overlap_moves() {
    let arm = Arc::new(RecordingArm::new().with_move_delay(Duration::from_millis(5)));
    let motion = MotionFlag::new();
    let running = RunningFlag::new();
    let transformer = CoordinateTransformer::new(1000.0, 0.2);

    let workers: Vec<_> = (0..3)
        .map(|w| {
            let (tx, rx) = target_channel(ChannelPolicy::Fifo);
            for i in 0..20 {
                let raw = position([400.0 + i as f64, 10.0 * w as f64, 100.0]);
                tx.push(transformer.transform(&raw, &RobotBaseOrigin::zero()).unwrap())
                    .unwrap();
            }
            drop(tx);
            let dispatcher = MotionDispatcher::new(
                arm.clone(),
                motion.clone(),
                Rpy::new(180.0, 0.0, 0.0),
                Duration::from_millis(5),
            );
            let running = running.clone();
            thread::spawn(move || dispatcher.run(&rx, &running).unwrap())
        })
        .collect();

    let stats: Vec<_> = workers.into_iter().map(|h| h.join().unwrap()).collect();
    let moved: u64 = stats.iter().map(|s| s.moved).sum();
    let skipped: u64 = stats.iter().map(|s| s.skipped_busy).sum();

    assert_eq!(arm.max_in_flight(), 1);
    assert_eq!(moved + skipped, 60);
    assert_eq!(arm.count(|c| matches!(c, ArmCall::MoveJoint(_))) as u64, moved);
    assert!(!motion.is_moving());
}

#[test]
fn robot_error_state_stops_tracking() {
    let frames = ScriptedFrameSource::new(vec![])
        .with_base(base_frame())
        .with_delay(Duration::from_millis(5));
    let arm = Arc::new(RecordingArm::new());
    let mut session = tracking_session(arm.clone(), frames);
    session.start().unwrap();
    session.calibrate().unwrap();

    let faulting = arm.clone();
    let fault = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        faulting.set_state(RobotState::Error);
    });

    let err = session.run_tracking().unwrap_err();
    fault.join().unwrap();

    assert!(matches!(err, Error::Robot { .. }));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(
        arm.teardown_calls(),
        vec![ArmCall::StopMotion, ArmCall::Disconnect, ArmCall::Uninitialize]
    );
}
