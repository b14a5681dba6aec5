// File: armtrack-core/src/sim.rs
//! Software stand-ins for the rig hardware, used by `--simulate`.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use armtrack_common::models::{
    JointAngles, JointLimits, MarkerFrame, Position, Quaternion, RobotCommand, RobotState, Rpy,
    SceneInfo,
};
use armtrack_common::traits::{FrameSource, Gripper, Reasoner, RobotArm};
use crate::Error;

/// Arm with a spherical workspace of radius `reach` (meters) around the base.
pub struct SimulatedArm {
    reach: f64,
    move_latency: Duration,
    initialized: AtomicBool,
    connected: AtomicBool,
    state: Mutex<RobotState>,
    joints: Mutex<JointAngles>,
}

impl SimulatedArm {
    pub fn new(reach: f64, move_latency: Duration) -> Self {
        Self {
            reach,
            move_latency,
            initialized: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            state: Mutex::new(RobotState::Idle),
            joints: Mutex::new(JointAngles::zeros()),
        }
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Connection("simulated arm is not connected".to_string()))
        }
    }

    fn simulate_motion(&self) {
        *self.state.lock() = RobotState::Running;
        thread::sleep(self.move_latency);
        *self.state.lock() = RobotState::Idle;
    }
}

impl Default for SimulatedArm {
    fn default() -> Self {
        Self::new(0.85, Duration::from_millis(50))
    }
}

impl RobotArm for SimulatedArm {
    fn initialize(&self) -> Result<(), Error> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn uninitialize(&self) -> Result<(), Error> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn connect(&self, host: &str, port: u16) -> Result<(), Error> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(Error::Connection("SDK not initialized".to_string()));
        }
        info!("Simulated arm connected (pretending to be {host}:{port})");
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), Error> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn enable_events(&self) -> Result<(), Error> {
        self.ensure_connected()
    }

    fn init_profile(&self) -> Result<(), Error> {
        self.ensure_connected()
    }

    fn configure(&self, limits: &JointLimits) -> Result<(), Error> {
        self.ensure_connected()?;
        debug!("Joint limits: {:?}", limits);
        Ok(())
    }

    fn move_to_cartesian(&self, position: &Position, _rotation: &Rpy) -> Result<(), Error> {
        self.ensure_connected()?;
        if position.norm() > self.reach {
            return Err(Error::Robot {
                code: -2,
                message: "cartesian target outside workspace".to_string(),
            });
        }
        self.simulate_motion();
        Ok(())
    }

    fn move_joint(&self, joints: &JointAngles) -> Result<(), Error> {
        self.ensure_connected()?;
        self.simulate_motion();
        *self.joints.lock() = *joints;
        Ok(())
    }

    fn current_joint_waypoint(&self) -> Result<JointAngles, Error> {
        self.ensure_connected()?;
        Ok(*self.joints.lock())
    }

    fn solve_inverse_kinematics(
        &self,
        _current: &JointAngles,
        position: &Position,
        orientation: &Quaternion,
    ) -> Result<Option<JointAngles>, Error> {
        self.ensure_connected()?;
        let distance = position.norm();
        if distance > self.reach {
            return Ok(None);
        }
        let (roll, pitch, yaw) = orientation.euler_angles();
        Ok(Some(JointAngles([
            position.y.atan2(position.x),
            position.z.atan2(position.x.hypot(position.y)),
            distance / self.reach,
            roll,
            pitch,
            yaw,
        ])))
    }

    fn state(&self) -> Result<RobotState, Error> {
        self.ensure_connected()?;
        Ok(*self.state.lock())
    }

    fn stop_motion(&self) -> Result<(), Error> {
        *self.state.lock() = RobotState::Stopped;
        Ok(())
    }
}

/// Replays hand frames in a loop at a fixed period and always shows the
/// base markers and any static objects.
pub struct SimulatedFrameSource {
    hand: Vec<MarkerFrame>,
    base: MarkerFrame,
    objects: Vec<MarkerFrame>,
    period: Duration,
    cursor: AtomicUsize,
    current: Mutex<Option<MarkerFrame>>,
}

impl SimulatedFrameSource {
    pub fn new(hand: Vec<MarkerFrame>, base: MarkerFrame, period: Duration) -> Self {
        Self {
            hand,
            base,
            objects: Vec::new(),
            period,
            cursor: AtomicUsize::new(0),
            current: Mutex::new(None),
        }
    }

    /// Adds a static object subject with a single `Center` marker.
    pub fn with_object(mut self, subject: &str, xyz: [f64; 3]) -> Self {
        self.objects
            .push(MarkerFrame::new(subject).with_marker("Center", xyz));
        self
    }

    /// A hand circling `center` (sensor millimeters) with `samples` frames
    /// per lap, over a base mounted at `base_origin`.
    pub fn circling(
        center: [f64; 3],
        radius: f64,
        samples: usize,
        base_origin: [f64; 3],
        period: Duration,
    ) -> Self {
        let hand = (0..samples.max(1))
            .map(|i| {
                let angle = TAU * i as f64 / samples.max(1) as f64;
                MarkerFrame::new("Hand").with_marker(
                    "Center",
                    [
                        center[0] + radius * angle.cos(),
                        center[1] + radius * angle.sin(),
                        center[2],
                    ],
                )
            })
            .collect();

        let [x, y, z] = base_origin;
        let base = MarkerFrame::new("Base")
            .with_marker("XYPlane1", [x - 50.0, y - 50.0, z - 40.0])
            .with_marker("XYPlane2", [x + 50.0, y - 50.0, z - 40.0])
            .with_marker("XYPlane3", [x + 50.0, y + 50.0, z - 40.0])
            .with_marker("XYPlane4", [x - 50.0, y + 50.0, z - 40.0])
            .with_marker("Zbase", [x, y, z]);

        Self::new(hand, base, period)
    }
}

impl FrameSource for SimulatedFrameSource {
    fn acquire_frame(&self) -> Result<bool, Error> {
        thread::sleep(self.period);
        if !self.hand.is_empty() {
            let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.hand.len();
            *self.current.lock() = Some(self.hand[i].clone());
        }
        Ok(true)
    }

    fn subject_markers(&self, subject: &str) -> Result<MarkerFrame, Error> {
        if subject == self.base.subject {
            return Ok(self.base.clone());
        }
        if let Some(object) = self.objects.iter().find(|o| o.subject == subject) {
            return Ok(object.clone());
        }
        match self.current.lock().as_ref() {
            Some(frame) if frame.subject == subject => Ok(frame.clone()),
            _ => Ok(MarkerFrame::new(subject)),
        }
    }
}

#[derive(Debug, Default)]
pub struct SimulatedGripper {
    position: AtomicU32,
}

impl SimulatedGripper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> u32 {
        self.position.load(Ordering::SeqCst)
    }
}

impl Gripper for SimulatedGripper {
    fn set_position(&self, value: u32) -> Result<(), Error> {
        debug!("Simulated gripper -> {value}");
        self.position.store(value, Ordering::SeqCst);
        Ok(())
    }
}

/// Offline reasoner: grabs the first scene object named in the prompt and
/// hands it to the user's palm when the palm faces up.
#[derive(Debug, Clone)]
pub struct KeywordReasoner {
    target: String,
}

impl KeywordReasoner {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for KeywordReasoner {
    fn default() -> Self {
        Self::new("Palm")
    }
}

impl Reasoner for KeywordReasoner {
    fn decide(&self, prompt: &str, scene: &SceneInfo) -> Result<RobotCommand, Error> {
        let prompt = prompt.to_lowercase();
        let Some(target) = scene.find(&self.target).filter(|_| scene.user.palm_up) else {
            return Ok(RobotCommand::noop());
        };
        let object = scene
            .objects
            .iter()
            .filter(|o| !o.name.eq_ignore_ascii_case(&self.target))
            .find(|o| prompt.contains(&o.name.to_lowercase()));

        Ok(match object {
            Some(o) => RobotCommand::place(o.clone(), target.clone()),
            None => RobotCommand::noop(),
        })
    }
}
