// ================================================================
// File: armtrack-common/src/error.rs
// ================================================================

use thiserror::Error;

use crate::models::grasp::GraspStepKind;

#[derive(Debug, Error)]
pub enum Error {
    /// Robot or sensor unreachable. Always fatal for the session.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A non-success status code reported by the robot SDK.
    #[error("Robot error {code}: {message}")]
    Robot { code: i32, message: String },

    #[error("No inverse-kinematics solution for grasp step {step}")]
    SolveFailure { step: GraspStepKind },

    #[error("Base calibration timed out after {waited_ms} ms")]
    CalibrationTimeout { waited_ms: u64 },

    #[error("Marker {marker} missing from subject {subject}")]
    MissingMarker { subject: String, marker: String },

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Gripper error: {0}")]
    Gripper(String),

    #[error("Target channel closed")]
    ChannelClosed,

    #[error("Robot is already executing a motion")]
    MotionBusy,

    #[error("A grasp sequence is already running")]
    GraspInProgress,

    #[error("Invalid session state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Interrupted by operator")]
    Interrupted,

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message broker error: {0}")]
    Broker(String),

    #[error("Reasoning service error: {0}")]
    Reasoner(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that must tear the session down instead of being skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::CalibrationTimeout { .. } | Error::Interrupted
        )
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}
