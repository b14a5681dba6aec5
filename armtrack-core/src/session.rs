// File: armtrack-core/src/session.rs
//! Session lifecycle: connect, calibrate, run tracking or grasps, tear down.
//!
//! ```text
//! Uninitialized --start--> Connecting --ok--> Ready --track/grasp--> Running
//!                              |                ^                       |
//!                              | failure        +---- grasp completes --+
//!                              v                                        v
//!                         Disconnected <------------------------- Stopping
//! ```
//!
//! Teardown (stop motion, disconnect if connected, uninitialize the SDK) runs
//! exactly once, whichever path reaches it first, including `Drop`.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use armtrack_common::models::{RobotBaseOrigin, RobotState};
use armtrack_common::traits::{FrameSource, Gripper, RobotArm};
use crate::calibration::BaseCalibrator;
use crate::channel::target_channel;
use crate::config::ControllerConfig;
use crate::dispatcher::{DispatchStats, MotionDispatcher};
use crate::grasp::{GraspPlan, GraspReport, GraspSequencer};
use crate::motion::{MotionFlag, RunningFlag};
use crate::producer::{ProducerStats, TrackingProducer};
use crate::Error;

const JOIN_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Ready,
    Running,
    Stopping,
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Connecting => "connecting",
            SessionState::Ready => "ready",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
            SessionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Worker statistics from a tracking run. A worker that had to be abandoned
/// or that failed leaves its entry empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingReport {
    pub producer: Option<ProducerStats>,
    pub dispatcher: Option<DispatchStats>,
}

enum Halt {
    Interrupted,
    WorkerExited,
    RobotFault,
    ConnectionLost(Error),
}

pub struct Session {
    config: ControllerConfig,
    robot: Arc<dyn RobotArm>,
    frames: Arc<dyn FrameSource>,
    sequencer: GraspSequencer,
    state: SessionState,
    running: RunningFlag,
    motion: MotionFlag,
    origin: Option<RobotBaseOrigin>,
    sdk_initialized: bool,
    torn_down: bool,
}

impl Session {
    pub fn new(
        config: ControllerConfig,
        robot: Arc<dyn RobotArm>,
        frames: Arc<dyn FrameSource>,
        gripper: Arc<dyn Gripper>,
    ) -> Self {
        let running = RunningFlag::new();
        let motion = MotionFlag::new();
        let sequencer = GraspSequencer::new(
            robot.clone(),
            gripper,
            motion.clone(),
            running.clone(),
            &config.grasp,
        );
        Self {
            config,
            robot,
            frames,
            sequencer,
            state: SessionState::Uninitialized,
            running,
            motion,
            origin: None,
            sdk_initialized: false,
            torn_down: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn origin(&self) -> Option<RobotBaseOrigin> {
        self.origin
    }

    /// Clearing this flag asks every loop of the session to wind down.
    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    /// Brings the arm up and parks it at the home pose.
    pub fn start(&mut self) -> Result<(), Error> {
        self.expect_state(SessionState::Uninitialized)?;
        self.set_state(SessionState::Connecting);

        match self.bring_up() {
            Ok(()) => {
                self.set_state(SessionState::Ready);
                Ok(())
            }
            Err(e) => {
                error!("Robot start-up failed: {e}");
                self.shutdown();
                Err(e)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        let rc = &self.config.robot;

        self.robot.initialize()?;
        self.sdk_initialized = true;

        info!("Connecting to robot at {}:{}", rc.host, rc.port);
        self.robot.connect(&rc.host, rc.port).map_err(|e| match e {
            Error::Connection(_) => e,
            other => Error::Connection(format!("{}:{}: {other}", rc.host, rc.port)),
        })?;
        if !self.robot.is_connected() {
            return Err(Error::Connection(format!(
                "{}:{} did not accept the connection",
                rc.host, rc.port
            )));
        }

        self.robot.enable_events()?;
        self.robot.init_profile()?;
        self.robot.configure(&rc.joint_limits)?;

        let home = rc.home_pose();
        self.robot.move_to_cartesian(&home.position, &home.rotation)?;
        info!("Robot connected and parked at home pose");
        Ok(())
    }

    /// Locates the robot base in sensor coordinates. Must precede tracking.
    pub fn calibrate(&mut self) -> Result<RobotBaseOrigin, Error> {
        self.expect_state(SessionState::Ready)?;

        let calibrator = BaseCalibrator::from_config(&self.config.calibration);
        match calibrator.calibrate(self.frames.as_ref(), &self.running) {
            Ok(origin) => {
                self.origin = Some(origin);
                Ok(origin)
            }
            Err(e) => {
                error!("Base calibration failed: {e}");
                if e.is_fatal() {
                    self.shutdown();
                }
                Err(e)
            }
        }
    }

    /// Runs the producer and dispatcher until the operator stops the session,
    /// the robot faults or a worker exits. Always ends in teardown.
    pub fn run_tracking(&mut self) -> Result<TrackingReport, Error> {
        self.expect_state(SessionState::Ready)?;
        let origin = self.origin.ok_or_else(|| Error::InvalidState {
            expected: "calibrated base origin".to_string(),
            actual: "uncalibrated".to_string(),
        })?;

        self.set_state(SessionState::Running);
        let result = self.track(origin);
        if let Err(e) = &result {
            error!("Tracking ended with error: {e}");
        }
        self.shutdown();
        result
    }

    fn track(&mut self, origin: RobotBaseOrigin) -> Result<TrackingReport, Error> {
        let (tx, rx) = target_channel(self.config.tracking.channel_policy);
        let producer = TrackingProducer::new(
            self.frames.clone(),
            &self.config.tracking,
            origin,
            self.motion.clone(),
            tx,
        );
        let dispatcher = MotionDispatcher::new(
            self.robot.clone(),
            self.motion.clone(),
            self.config.robot.home_rotation,
            self.config.dispatch.poll_interval(),
        );

        let running = self.running.clone();
        let producer_handle = thread::Builder::new()
            .name("armtrack-producer".to_string())
            .spawn(move || producer.run(&running))?;
        let running = self.running.clone();
        let dispatcher_handle = thread::Builder::new()
            .name("armtrack-dispatcher".to_string())
            .spawn(move || dispatcher.run(&rx, &running))?;

        let monitor_interval = Duration::from_millis(self.config.session.monitor_interval_ms);
        let halt = loop {
            if !self.running.is_running() {
                info!("Stop requested");
                break Halt::Interrupted;
            }
            if producer_handle.is_finished() || dispatcher_handle.is_finished() {
                warn!("A tracking worker exited on its own");
                break Halt::WorkerExited;
            }
            match self.robot.state() {
                Ok(RobotState::Error) => {
                    error!("Robot controller reported an error state");
                    break Halt::RobotFault;
                }
                Ok(state) => debug!("Robot state: {state}"),
                Err(e) if e.is_connection() => break Halt::ConnectionLost(e),
                Err(e) => warn!("Robot state query failed: {e}"),
            }
            thread::sleep(monitor_interval);
        };

        self.set_state(SessionState::Stopping);
        self.running.stop();

        let join_timeout = Duration::from_millis(self.config.session.join_timeout_ms);
        let producer = join_worker(producer_handle, join_timeout);
        let dispatcher = join_worker(dispatcher_handle, join_timeout);

        let mut failure = match halt {
            Halt::RobotFault => Some(Error::Robot {
                code: -1,
                message: "controller entered error state".to_string(),
            }),
            Halt::ConnectionLost(e) => Some(e),
            Halt::Interrupted | Halt::WorkerExited => None,
        };
        let mut report = TrackingReport::default();
        match producer {
            Some(Ok(stats)) => report.producer = Some(stats),
            Some(Err(e)) => {
                failure.get_or_insert(e);
            }
            None => {}
        }
        match dispatcher {
            Some(Ok(stats)) => report.dispatcher = Some(stats),
            Some(Err(e)) => {
                failure.get_or_insert(e);
            }
            None => {}
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Runs one grasp. An unreachable pose aborts the grasp but keeps the
    /// session usable; any other failure tears it down.
    pub fn run_grasp(&mut self, plan: &GraspPlan) -> Result<GraspReport, Error> {
        self.expect_state(SessionState::Ready)?;
        self.set_state(SessionState::Running);

        match self.sequencer.execute(plan) {
            Ok(report) => {
                self.set_state(SessionState::Ready);
                Ok(report)
            }
            Err(e @ Error::SolveFailure { .. }) => {
                self.set_state(SessionState::Ready);
                Err(e)
            }
            Err(e) => {
                error!("Grasp failed: {e}");
                self.shutdown();
                Err(e)
            }
        }
    }

    /// Stop motion, disconnect, uninitialize. Idempotent.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.set_state(SessionState::Stopping);
        self.running.stop();

        if self.sdk_initialized {
            if let Err(e) = self.robot.stop_motion() {
                warn!("Failed to stop robot motion: {e}");
            }
            if self.robot.is_connected() {
                if let Err(e) = self.robot.disconnect() {
                    warn!("Failed to disconnect robot: {e}");
                }
            }
            if let Err(e) = self.robot.uninitialize() {
                warn!("Failed to uninitialize robot SDK: {e}");
            }
        }

        self.set_state(SessionState::Disconnected);
        info!("Session shut down");
    }

    fn expect_state(&self, required: SessionState) -> Result<(), Error> {
        if self.state == required {
            return Ok(());
        }
        Err(Error::InvalidState {
            expected: required.to_string(),
            actual: self.state.to_string(),
        })
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Joins `handle` if it finishes within `timeout`; otherwise leaves it running
/// detached and returns `None`.
fn join_worker<T>(handle: JoinHandle<Result<T, Error>>, timeout: Duration) -> Option<Result<T, Error>> {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("{name} did not stop within {timeout:?}; abandoning it");
            return None;
        }
        thread::sleep(JOIN_POLL);
    }
    match handle.join() {
        Ok(result) => Some(result),
        Err(_) => {
            error!("{name} panicked");
            Some(Err(Error::WorkerPanicked(name)))
        }
    }
}
