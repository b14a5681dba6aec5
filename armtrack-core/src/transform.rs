// File: armtrack-core/src/transform.rs
//! Sensor frame -> robot-base frame.

use armtrack_common::models::geometry::is_zero;
use armtrack_common::models::{Position, RobotBaseOrigin, RobotPose, Rpy};
use crate::config::TrackingConfig;

/// A validated target in robot-base meters with the tool offset applied.
/// Only [`CoordinateTransformer::transform`] creates one, so a `Target` never
/// stems from an occluded marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    position: Position,
}

impl Target {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn pose(&self, rotation: Rpy) -> RobotPose {
        RobotPose::new(self.position, rotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    unit_scale: f64,
    tool_offset: f64,
}

impl CoordinateTransformer {
    pub fn new(unit_scale: f64, tool_offset: f64) -> Self {
        Self {
            unit_scale,
            tool_offset,
        }
    }

    pub fn from_config(cfg: &TrackingConfig) -> Self {
        Self::new(cfg.unit_scale, cfg.tool_offset)
    }

    /// Returns `None` for an occluded (all-zero) reading.
    pub fn transform(&self, raw: &Position, origin: &RobotBaseOrigin) -> Option<Target> {
        if is_zero(raw) {
            return None;
        }
        let mut position = raw / self.unit_scale - origin.position() / self.unit_scale;
        position.z += self.tool_offset;
        Some(Target { position })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armtrack_common::models::geometry::position;

    fn rig() -> CoordinateTransformer {
        CoordinateTransformer::new(1000.0, 0.2)
    }

    #[test]
    fn occluded_marker_yields_no_target() {
        let origin = RobotBaseOrigin::new(position([120.0, -40.0, 15.0]));
        assert!(rig().transform(&position([0.0, 0.0, 0.0]), &origin).is_none());
    }

    #[test]
    fn known_reading_with_zero_origin() {
        let target = rig()
            .transform(&position([596.527, 47.547, 270.0]), &RobotBaseOrigin::zero())
            .unwrap();
        let p = target.position();
        assert_relative_eq!(p.x, 0.596527, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.047547, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.47, epsilon = 1e-12);
    }

    #[test]
    fn matches_closed_form_for_assorted_inputs() {
        let t = CoordinateTransformer::new(1000.0, 0.15);
        let origin = RobotBaseOrigin::new(position([250.0, -130.5, 12.25]));
        let samples = [
            [1.0, 0.0, 0.0],
            [-812.4, 33.3, 900.0],
            [0.0, 0.0, -5.0],
            [1e4, -1e4, 0.001],
        ];
        for raw in samples {
            let raw = position(raw);
            let expected = raw / 1000.0 - origin.position() / 1000.0 + position([0.0, 0.0, 0.15]);
            let got = t.transform(&raw, &origin).unwrap().position();
            assert_relative_eq!(got, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let origin = RobotBaseOrigin::new(position([10.0, 20.0, 30.0]));
        let raw = position([400.0, 50.0, 120.0]);
        assert_eq!(rig().transform(&raw, &origin), rig().transform(&raw, &origin));
    }
}
