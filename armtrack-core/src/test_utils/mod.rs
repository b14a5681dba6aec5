// File: armtrack-core/src/test_utils/mod.rs

pub mod fakes;

pub use fakes::{ArmCall, RecordingArm, RecordingGripper, ScriptedFrameSource};

use armtrack_common::models::MarkerFrame;

/// A base sample whose origin works out to (120, 220, 55) in sensor units.
pub fn base_frame() -> MarkerFrame {
    MarkerFrame::new("Base")
        .with_marker("XYPlane1", [100.0, 200.0, 10.0])
        .with_marker("XYPlane2", [140.0, 200.0, 12.0])
        .with_marker("XYPlane3", [140.0, 240.0, 11.0])
        .with_marker("XYPlane4", [100.0, 240.0, 9.0])
        .with_marker("Zbase", [120.0, 220.0, 55.0])
}

pub fn hand_frame(xyz: [f64; 3]) -> MarkerFrame {
    MarkerFrame::new("Hand").with_marker("Center", xyz)
}
