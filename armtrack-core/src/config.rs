//! Immutable controller configuration, loaded once and handed to the session.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use armtrack_common::models::geometry::position;
use armtrack_common::models::{JointLimits, RobotPose, Rpy};
use crate::channel::ChannelPolicy;
use crate::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub robot: RobotConfig,
    pub tracking: TrackingConfig,
    pub calibration: CalibrationConfig,
    pub dispatch: DispatchConfig,
    pub grasp: GraspConfig,
    pub session: SessionConfig,
    pub broker: BrokerConfig,
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub host: String,
    pub port: u16,
    pub joint_limits: JointLimits,
    /// Where the arm parks after connecting and after every grasp.
    pub home_position: [f64; 3],
    /// Tool orientation used for every tracked target and grasp pose.
    pub home_rotation: Rpy,
    /// Drop-off pose for `grab_object` commands that only carry a position.
    pub place_position: [f64; 3],
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.246".to_string(),
            port: 8899,
            joint_limits: JointLimits::default(),
            home_position: [0.410444, 0.080962, 0.547597],
            home_rotation: Rpy::new(179.99847, -0.000170, 84.27533),
            place_position: [0.0, 0.6, 0.25],
        }
    }
}

impl RobotConfig {
    pub fn home_pose(&self) -> RobotPose {
        RobotPose::new(position(self.home_position), self.home_rotation)
    }

    pub fn place_pose(&self) -> RobotPose {
        RobotPose::new(position(self.place_position), self.home_rotation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub subject: String,
    pub marker: String,
    /// Sensor units per meter.
    pub unit_scale: f64,
    /// Added to Z so the flange stops above the tracked point.
    pub tool_offset: f64,
    pub channel_policy: ChannelPolicy,
    /// Back-off when the frame source reports no new frame.
    pub idle_poll_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            subject: "Hand".to_string(),
            marker: "Center".to_string(),
            unit_scale: 1000.0,
            tool_offset: 0.2,
            channel_policy: ChannelPolicy::Latest,
            idle_poll_ms: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub subject: String,
    pub planar_markers: Vec<String>,
    pub height_marker: String,
    /// `None` polls forever.
    pub timeout_ms: Option<u64>,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            subject: "Base".to_string(),
            planar_markers: (1..=4).map(|i| format!("XYPlane{i}")).collect(),
            height_marker: "Zbase".to_string(),
            timeout_ms: Some(30_000),
            initial_backoff_ms: 10,
            max_backoff_ms: 500,
        }
    }
}

impl CalibrationConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Bounded wait on the target channel between running-flag checks.
    pub poll_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 1000 }
    }
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspConfig {
    pub lift_delta: f64,
    pub transit_delta: f64,
    pub gripper_close: u32,
    pub gripper_open: u32,
    /// Settle after Approach, Grip and Lift.
    pub pick_settle_ms: u64,
    /// Settle after Transit, LowerAtTarget, Release and Retreat.
    pub place_settle_ms: u64,
}

impl Default for GraspConfig {
    fn default() -> Self {
        Self {
            lift_delta: 0.2,
            transit_delta: 0.1,
            gripper_close: 20,
            gripper_open: 900,
            pick_settle_ms: 1000,
            place_settle_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub monitor_interval_ms: u64,
    /// How long to wait for a worker after shutdown before abandoning it.
    pub join_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: 100,
            join_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub command_channel: String,
    pub poll_interval_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            command_channel: "robot_command_channel".to_string(),
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Capture subjects offered to the reasoner as graspable objects.
    pub objects: Vec<String>,
    pub marker: String,
    /// Name under which the tracked hand is listed, as a place target.
    pub hand_label: String,
    /// Objects farther than this from the base (meters) are out of range.
    pub reach: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            objects: vec!["apple".to_string(), "banana".to_string(), "orange".to_string()],
            marker: "Center".to_string(),
            hand_label: "Palm".to_string(),
            reach: 0.85,
        }
    }
}

impl ControllerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ControllerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!("Loaded controller config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Falls back to the built-in rig defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            warn!(
                "Config file {} not found; using defaults.",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.robot.host.trim().is_empty() {
            return Err("robot.host must not be empty".into());
        }
        if self.robot.port == 0 {
            return Err("robot.port must be non-zero".into());
        }
        if !(self.tracking.unit_scale.is_finite() && self.tracking.unit_scale > 0.0) {
            return Err(Error::Config(format!(
                "tracking.unit_scale must be positive, got {}",
                self.tracking.unit_scale
            )));
        }
        if !self.tracking.tool_offset.is_finite() {
            return Err("tracking.tool_offset must be finite".into());
        }
        if self.tracking.subject.is_empty() || self.tracking.marker.is_empty() {
            return Err("tracking.subject and tracking.marker must be set".into());
        }
        if self.calibration.planar_markers.len() != 4 {
            return Err(Error::Config(format!(
                "calibration.planar_markers needs exactly 4 names, got {}",
                self.calibration.planar_markers.len()
            )));
        }
        if self
            .calibration
            .planar_markers
            .iter()
            .chain(std::iter::once(&self.calibration.height_marker))
            .any(|m| m.is_empty())
        {
            return Err("calibration marker names must not be empty".into());
        }
        if self.calibration.initial_backoff_ms == 0
            || self.calibration.max_backoff_ms < self.calibration.initial_backoff_ms
        {
            return Err("calibration backoff must satisfy 0 < initial <= max".into());
        }
        if self.dispatch.poll_interval_ms == 0 || self.session.monitor_interval_ms == 0 {
            return Err("poll intervals must be non-zero".into());
        }
        if self.broker.command_channel.is_empty() {
            return Err("broker.command_channel must be set".into());
        }
        if !(self.scene.reach.is_finite() && self.scene.reach > 0.0) {
            return Err(Error::Config(format!(
                "scene.reach must be positive, got {}",
                self.scene.reach
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_rig() {
        let cfg = ControllerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.robot.port, 8899);
        assert_eq!(cfg.tracking.unit_scale, 1000.0);
        assert_eq!(cfg.calibration.planar_markers[3], "XYPlane4");
        assert_eq!(cfg.tracking.channel_policy, ChannelPolicy::Latest);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"robot": {{"host": "10.0.0.5"}}, "tracking": {{"channel_policy": "fifo"}}}}"#
        )
        .unwrap();

        let cfg = ControllerConfig::load(file.path()).unwrap();
        assert_eq!(cfg.robot.host, "10.0.0.5");
        assert_eq!(cfg.robot.port, 8899);
        assert_eq!(cfg.tracking.channel_policy, ChannelPolicy::Fifo);
        assert_eq!(cfg.grasp.gripper_open, 900);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ControllerConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg, ControllerConfig::default());
    }

    #[test]
    fn rejects_bad_scale_and_marker_count() {
        let mut cfg = ControllerConfig::default();
        cfg.tracking.unit_scale = 0.0;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let mut cfg = ControllerConfig::default();
        cfg.calibration.planar_markers.pop();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let mut cfg = ControllerConfig::default();
        cfg.scene.reach = -1.0;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}
