// File: armtrack-core/src/calibration.rs
//! One-shot robot-base calibration from the reference markers on the mount.
//!
//! The mount carries four markers in the XY plane around the base axis and one
//! marker at the base height. The origin is the mean of the planar markers in
//! X/Y, with Z taken from the height marker.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use armtrack_common::models::geometry::is_zero;
use armtrack_common::models::{MarkerFrame, Position, RobotBaseOrigin};
use armtrack_common::traits::FrameSource;
use crate::config::CalibrationConfig;
use crate::motion::RunningFlag;
use crate::Error;

#[derive(Debug, Clone)]
pub struct BaseCalibrator {
    subject: String,
    planar_markers: Vec<String>,
    height_marker: String,
    timeout: Option<Duration>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl BaseCalibrator {
    pub fn from_config(cfg: &CalibrationConfig) -> Self {
        Self {
            subject: cfg.subject.clone(),
            planar_markers: cfg.planar_markers.clone(),
            height_marker: cfg.height_marker.clone(),
            timeout: cfg.timeout(),
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
        }
    }

    /// Computes the origin from one sample, or `None` if any reference marker
    /// is missing or occluded.
    pub fn origin_from_markers(&self, frame: &MarkerFrame) -> Option<RobotBaseOrigin> {
        let mut sum = Position::zeros();
        for name in &self.planar_markers {
            let p = frame.marker(name).filter(|p| !is_zero(p))?;
            sum += p;
        }
        let height = frame.marker(&self.height_marker).filter(|p| !is_zero(p))?;

        let mean = sum / self.planar_markers.len() as f64;
        Some(RobotBaseOrigin::new(Position::new(mean.x, mean.y, height.z)))
    }

    /// Polls `source` until a non-degenerate sample arrives, backing off
    /// exponentially between attempts.
    pub fn calibrate(
        &self,
        source: &dyn FrameSource,
        running: &RunningFlag,
    ) -> Result<RobotBaseOrigin, Error> {
        let started = Instant::now();
        let mut backoff = self.initial_backoff;
        let mut attempts: u32 = 0;

        loop {
            if !running.is_running() {
                return Err(Error::Interrupted);
            }
            attempts += 1;

            match self.sample(source) {
                Ok(Some(origin)) => {
                    let p = origin.position();
                    info!(
                        "Robot base calibrated after {attempts} attempt(s): ({:.3}, {:.3}, {:.3})",
                        p.x, p.y, p.z
                    );
                    return Ok(origin);
                }
                Ok(None) => debug!("Degenerate base reading (attempt {attempts}); polling again"),
                Err(e) if e.is_connection() => return Err(e),
                Err(e) => warn!("Base calibration poll failed: {e}"),
            }

            let pause = match self.timeout {
                Some(limit) => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        return Err(Error::CalibrationTimeout {
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    backoff.min(limit - waited)
                }
                None => backoff,
            };
            thread::sleep(pause);
            backoff = (backoff * 2).min(self.max_backoff);
        }
    }

    fn sample(&self, source: &dyn FrameSource) -> Result<Option<RobotBaseOrigin>, Error> {
        if !source.acquire_frame()? {
            return Ok(None);
        }
        let frame = source.subject_markers(&self.subject)?;
        Ok(self.origin_from_markers(&frame))
    }
}
