// ================================================================
// File: armtrack-common/src/models/mod.rs
// ================================================================

pub mod command;
pub mod frame;
pub mod geometry;
pub mod grasp;
pub mod robot;
pub mod scene;

pub use command::{CommandAction, FunctionName, RobotCommand};
pub use frame::{MarkerFrame, RobotBaseOrigin};
pub use geometry::{Position, Quaternion, RobotPose, Rpy};
pub use grasp::{GraspStepKind, GripperAction};
pub use robot::{JointAngles, JointLimits, MotionState, RobotState};
pub use scene::{ObjectInfo, SceneInfo, UserInfo};
