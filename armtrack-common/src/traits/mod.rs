pub mod broker_traits;
pub mod device_traits;
pub mod reasoning_traits;

pub use broker_traits::{MessageBroker, Subscription};
pub use device_traits::{FrameSource, Gripper, RobotArm};
pub use reasoning_traits::Reasoner;
