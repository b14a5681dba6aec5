// src/lib.rs

pub mod broker;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod decision;
pub mod dispatcher;
pub mod grasp;
pub mod motion;
pub mod producer;
pub mod router;
pub mod scene;
pub mod session;
pub mod sim;
pub mod test_utils;
pub mod transform;

pub use armtrack_common::{Error, Result};
pub use config::ControllerConfig;
pub use session::{Session, SessionState};
