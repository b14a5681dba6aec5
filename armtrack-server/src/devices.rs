//! Device selection for the binary.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use armtrack_common::traits::{FrameSource, Gripper, RobotArm};
use armtrack_core::sim::{SimulatedArm, SimulatedFrameSource, SimulatedGripper};
use armtrack_core::{ControllerConfig, Error};

pub struct Devices {
    pub robot: Arc<dyn RobotArm>,
    pub frames: Arc<dyn FrameSource>,
    pub gripper: Arc<dyn Gripper>,
}

// Simulated rig: base mounted at (100, 50, 20) mm in capture space, hand
// circling 45 cm in front of it, two fruits within reach and one beyond.
const SIM_BASE_MM: [f64; 3] = [100.0, 50.0, 20.0];
const SIM_HAND_CENTER_MM: [f64; 3] = [550.0, 50.0, 170.0];
const SIM_HAND_RADIUS_MM: f64 = 80.0;

pub fn open(simulate: bool, config: &ControllerConfig) -> Result<Devices, Error> {
    if !simulate {
        return Err(Error::Config(format!(
            "no hardware backend is linked into this build (robot {}:{}); run with --simulate",
            config.robot.host, config.robot.port
        )));
    }

    info!("Using simulated arm, capture system and gripper");
    Ok(Devices {
        robot: Arc::new(SimulatedArm::new(0.85, Duration::from_millis(50))),
        frames: Arc::new(SimulatedFrameSource::circling(
            SIM_HAND_CENTER_MM,
            SIM_HAND_RADIUS_MM,
            120,
            SIM_BASE_MM,
            Duration::from_millis(10),
        )
        .with_object("apple", [550.0, 150.0, 70.0])
        .with_object("orange", [500.0, -150.0, 70.0])
        .with_object("banana", [1400.0, 50.0, 70.0])),
        gripper: Arc::new(SimulatedGripper::new()),
    })
}
