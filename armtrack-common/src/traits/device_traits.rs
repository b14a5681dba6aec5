//! Narrow interfaces over the vendor drivers. Implementations are expected to
//! be internally synchronized: the robot handle is shared between the session
//! thread (state polling, shutdown) and the dispatcher thread (motion).

use crate::error::Error;
use crate::models::frame::MarkerFrame;
use crate::models::geometry::{Position, Quaternion, Rpy};
use crate::models::robot::{JointAngles, JointLimits, RobotState};

/// Motion-capture driver.
pub trait FrameSource: Send + Sync {
    /// Advances to the next sample. Blocks for at most one capture period;
    /// `Ok(false)` means no new frame was available.
    fn acquire_frame(&self) -> Result<bool, Error>;

    /// Marker positions of `subject` in the most recently acquired frame.
    fn subject_markers(&self, subject: &str) -> Result<MarkerFrame, Error>;
}

/// Robot arm SDK.
pub trait RobotArm: Send + Sync {
    /// Process-wide SDK setup; paired with [`RobotArm::uninitialize`].
    fn initialize(&self) -> Result<(), Error>;
    fn uninitialize(&self) -> Result<(), Error>;

    fn connect(&self, host: &str, port: u16) -> Result<(), Error>;
    fn disconnect(&self) -> Result<(), Error>;
    fn is_connected(&self) -> bool;

    fn enable_events(&self) -> Result<(), Error>;
    fn init_profile(&self) -> Result<(), Error>;
    fn configure(&self, limits: &JointLimits) -> Result<(), Error>;

    fn move_to_cartesian(&self, position: &Position, rotation: &Rpy) -> Result<(), Error>;

    /// Blocks until the motion completes or fails.
    fn move_joint(&self, joints: &JointAngles) -> Result<(), Error>;

    fn current_joint_waypoint(&self) -> Result<JointAngles, Error>;

    /// `Ok(None)` when the pose is unreachable from `current`.
    fn solve_inverse_kinematics(
        &self,
        current: &JointAngles,
        position: &Position,
        orientation: &Quaternion,
    ) -> Result<Option<JointAngles>, Error>;

    fn state(&self) -> Result<RobotState, Error>;
    fn stop_motion(&self) -> Result<(), Error>;
}

pub trait Gripper: Send + Sync {
    /// Finger position in driver units (20 closes on the objects we use, 900
    /// is fully open).
    fn set_position(&self, value: u32) -> Result<(), Error>;
}
