// File: armtrack-core/src/test_utils/fakes.rs
//! Hand-written collaborator fakes that record what the controller asked for.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use armtrack_common::models::geometry::to_array;
use armtrack_common::models::{
    JointAngles, JointLimits, MarkerFrame, Position, Quaternion, RobotState, Rpy,
};
use armtrack_common::traits::{FrameSource, Gripper, RobotArm};
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ArmCall {
    Initialize,
    Uninitialize,
    Connect { host: String, port: u16 },
    Disconnect,
    EnableEvents,
    InitProfile,
    Configure,
    MoveToCartesian([f64; 3]),
    SolveIk([f64; 3]),
    MoveJoint(JointAngles),
    StopMotion,
}

/// Robot arm fake. Every IK request succeeds unless scripted otherwise, every
/// move takes `move_delay`, and concurrent moves are counted.
pub struct RecordingArm {
    calls: Mutex<Vec<ArmCall>>,
    connected: AtomicBool,
    refuse_connect: bool,
    state: Mutex<RobotState>,
    move_delay: Duration,
    ik_calls: AtomicUsize,
    ik_failures: HashSet<usize>,
    unreachable: bool,
    joints: Mutex<JointAngles>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for RecordingArm {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingArm {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            refuse_connect: false,
            state: Mutex::new(RobotState::Idle),
            move_delay: Duration::ZERO,
            ik_calls: AtomicUsize::new(0),
            ik_failures: HashSet::new(),
            unreachable: false,
            joints: Mutex::new(JointAngles::zeros()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay = delay;
        self
    }

    /// The `n`-th IK request (1-based) finds no solution.
    pub fn with_ik_failure_at(mut self, n: usize) -> Self {
        self.ik_failures.insert(n);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn set_state(&self, state: RobotState) {
        *self.state.lock() = state;
    }

    pub fn calls(&self) -> Vec<ArmCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&ArmCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// The stop/disconnect/uninitialize calls, in the order they happened.
    pub fn teardown_calls(&self) -> Vec<ArmCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    ArmCall::StopMotion | ArmCall::Disconnect | ArmCall::Uninitialize
                )
            })
            .cloned()
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: ArmCall) {
        self.calls.lock().push(call);
    }
}

impl RobotArm for RecordingArm {
    fn initialize(&self) -> Result<(), Error> {
        self.record(ArmCall::Initialize);
        Ok(())
    }

    fn uninitialize(&self) -> Result<(), Error> {
        self.record(ArmCall::Uninitialize);
        Ok(())
    }

    fn connect(&self, host: &str, port: u16) -> Result<(), Error> {
        self.record(ArmCall::Connect {
            host: host.to_string(),
            port,
        });
        if self.refuse_connect {
            return Err(Error::Connection(format!("{host}:{port} refused")));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), Error> {
        self.record(ArmCall::Disconnect);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn enable_events(&self) -> Result<(), Error> {
        self.record(ArmCall::EnableEvents);
        Ok(())
    }

    fn init_profile(&self) -> Result<(), Error> {
        self.record(ArmCall::InitProfile);
        Ok(())
    }

    fn configure(&self, _limits: &JointLimits) -> Result<(), Error> {
        self.record(ArmCall::Configure);
        Ok(())
    }

    fn move_to_cartesian(&self, position: &Position, _rotation: &Rpy) -> Result<(), Error> {
        self.record(ArmCall::MoveToCartesian(to_array(position)));
        Ok(())
    }

    fn move_joint(&self, joints: &JointAngles) -> Result<(), Error> {
        self.record(ArmCall::MoveJoint(*joints));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.move_delay.is_zero() {
            thread::sleep(self.move_delay);
        }
        *self.joints.lock() = *joints;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn current_joint_waypoint(&self) -> Result<JointAngles, Error> {
        Ok(*self.joints.lock())
    }

    fn solve_inverse_kinematics(
        &self,
        _current: &JointAngles,
        position: &Position,
        _orientation: &Quaternion,
    ) -> Result<Option<JointAngles>, Error> {
        self.record(ArmCall::SolveIk(to_array(position)));
        let n = self.ik_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.unreachable || self.ik_failures.contains(&n) {
            return Ok(None);
        }
        Ok(Some(JointAngles([
            position.x, position.y, position.z, 0.0, 0.0, 0.0,
        ])))
    }

    fn state(&self) -> Result<RobotState, Error> {
        Ok(*self.state.lock())
    }

    fn stop_motion(&self) -> Result<(), Error> {
        self.record(ArmCall::StopMotion);
        Ok(())
    }
}

/// Replays hand frames in order, then reports no new frames. When a base
/// sample is set, base lookups always return it and acquisition keeps
/// succeeding after the hand frames run out.
pub struct ScriptedFrameSource {
    pending: Mutex<VecDeque<MarkerFrame>>,
    current: Mutex<Option<MarkerFrame>>,
    base: Option<MarkerFrame>,
    delay: Duration,
    acquired: AtomicUsize,
}

impl ScriptedFrameSource {
    pub fn new(frames: Vec<MarkerFrame>) -> Self {
        Self {
            pending: Mutex::new(frames.into()),
            current: Mutex::new(None),
            base: None,
            delay: Duration::ZERO,
            acquired: AtomicUsize::new(0),
        }
    }

    pub fn with_base(mut self, base: MarkerFrame) -> Self {
        self.base = Some(base);
        self
    }

    /// Each acquisition blocks this long, like a capture device waiting for
    /// its next period.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl FrameSource for ScriptedFrameSource {
    fn acquire_frame(&self) -> Result<bool, Error> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let next = self.pending.lock().pop_front();
        let fresh = next.is_some();
        *self.current.lock() = next;
        if fresh || self.base.is_some() {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }
        Ok(fresh || self.base.is_some())
    }

    fn subject_markers(&self, subject: &str) -> Result<MarkerFrame, Error> {
        if let Some(base) = self.base.as_ref().filter(|b| b.subject == subject) {
            return Ok(base.clone());
        }
        Ok(self
            .current
            .lock()
            .clone()
            .filter(|f| f.subject == subject)
            .unwrap_or_else(|| MarkerFrame::new(subject)))
    }
}

#[derive(Default)]
pub struct RecordingGripper {
    positions: Mutex<Vec<u32>>,
}

impl RecordingGripper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> Vec<u32> {
        self.positions.lock().clone()
    }
}

impl Gripper for RecordingGripper {
    fn set_position(&self, value: u32) -> Result<(), Error> {
        self.positions.lock().push(value);
        Ok(())
    }
}
