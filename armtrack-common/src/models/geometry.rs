//! Cartesian types shared by the transformer, the dispatcher and the grasp
//! sequencer. Positions are plain `nalgebra` vectors; the unit depends on the
//! frame they live in (sensor millimeters or robot-base meters).

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

pub type Position = Vector3<f64>;
pub type Quaternion = UnitQuaternion<f64>;

/// Builds a position from the `[x, y, z]` arrays used in config and on the wire.
pub fn position(xyz: [f64; 3]) -> Position {
    Vector3::new(xyz[0], xyz[1], xyz[2])
}

pub fn to_array(p: &Position) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// The capture device reports an occluded marker as exactly zero on every axis.
pub fn is_zero(p: &Position) -> bool {
    p.x == 0.0 && p.y == 0.0 && p.z == 0.0
}

/// Roll/pitch/yaw in degrees, the form the robot's teach pendant shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rpy {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Rpy {
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn to_quaternion(&self) -> Quaternion {
        UnitQuaternion::from_euler_angles(
            self.roll.to_radians(),
            self.pitch.to_radians(),
            self.yaw.to_radians(),
        )
    }
}

/// Cartesian position (robot-base meters) plus orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotPose {
    pub position: Position,
    pub rotation: Rpy,
}

impl RobotPose {
    pub fn new(position: Position, rotation: Rpy) -> Self {
        Self { position, rotation }
    }

    /// Same pose shifted straight up by `dz` meters.
    pub fn lifted(&self, dz: f64) -> Self {
        Self {
            position: self.position + Vector3::new(0.0, 0.0, dz),
            rotation: self.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rpy_to_quaternion_round_trips_through_euler_angles() {
        let rpy = Rpy::new(10.0, -20.0, 84.27533);
        let (r, p, y) = rpy.to_quaternion().euler_angles();
        assert_relative_eq!(r.to_degrees(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(p.to_degrees(), -20.0, epsilon = 1e-9);
        assert_relative_eq!(y.to_degrees(), 84.27533, epsilon = 1e-9);
    }

    #[test]
    fn lifted_only_moves_z() {
        let pose = RobotPose::new(position([0.0, 0.6, 0.25]), Rpy::new(180.0, 0.0, 0.0));
        let up = pose.lifted(0.1);
        assert_relative_eq!(up.position.x, 0.0);
        assert_relative_eq!(up.position.y, 0.6);
        assert_relative_eq!(up.position.z, 0.35, epsilon = 1e-12);
        assert_eq!(up.rotation, pose.rotation);
    }

    #[test]
    fn zero_detection_requires_every_axis() {
        assert!(is_zero(&position([0.0, 0.0, 0.0])));
        assert!(!is_zero(&position([0.0, 0.0, 1e-9])));
    }
}
