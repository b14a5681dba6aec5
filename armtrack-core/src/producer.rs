// File: armtrack-core/src/producer.rs
//! Tracking producer: frame source -> transformer -> target channel.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use armtrack_common::models::RobotBaseOrigin;
use armtrack_common::traits::FrameSource;
use crate::channel::TargetSender;
use crate::config::TrackingConfig;
use crate::motion::{MotionFlag, RunningFlag};
use crate::transform::CoordinateTransformer;
use crate::Error;

/// What one pass of the producer loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProduceOutcome {
    NoFrame,
    Occluded,
    /// Dropped because the dispatcher was mid-move.
    DiscardedBusy,
    Published { replaced: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub frames: u64,
    pub occluded: u64,
    pub discarded_busy: u64,
    pub published: u64,
    /// Published targets that overwrote one the dispatcher never took.
    pub superseded: u64,
}

pub struct TrackingProducer {
    frames: Arc<dyn FrameSource>,
    transformer: CoordinateTransformer,
    origin: RobotBaseOrigin,
    subject: String,
    marker: String,
    motion: MotionFlag,
    sender: TargetSender,
    idle_poll: Duration,
}

impl TrackingProducer {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        cfg: &TrackingConfig,
        origin: RobotBaseOrigin,
        motion: MotionFlag,
        sender: TargetSender,
    ) -> Self {
        Self {
            frames,
            transformer: CoordinateTransformer::from_config(cfg),
            origin,
            subject: cfg.subject.clone(),
            marker: cfg.marker.clone(),
            motion,
            sender,
            idle_poll: Duration::from_millis(cfg.idle_poll_ms),
        }
    }

    pub fn step(&self) -> Result<ProduceOutcome, Error> {
        if !self.frames.acquire_frame()? {
            return Ok(ProduceOutcome::NoFrame);
        }

        let frame = match self.frames.subject_markers(&self.subject) {
            Ok(frame) => frame,
            Err(Error::MissingMarker { .. }) => return Ok(ProduceOutcome::Occluded),
            Err(e) => return Err(e),
        };
        let raw = match frame.require(&self.marker) {
            Ok(raw) => raw,
            Err(Error::MissingMarker { .. }) => return Ok(ProduceOutcome::Occluded),
            Err(e) => return Err(e),
        };
        let Some(target) = self.transformer.transform(&raw, &self.origin) else {
            return Ok(ProduceOutcome::Occluded);
        };

        if self.motion.is_moving() {
            return Ok(ProduceOutcome::DiscardedBusy);
        }

        let replaced = self.sender.push(target)?;
        let p = target.position();
        trace!(
            "Target ({:.4}, {:.4}, {:.4}) from frame captured at {}",
            p.x,
            p.y,
            p.z,
            frame.captured_at.format("%H:%M:%S%.3f")
        );
        Ok(ProduceOutcome::Published { replaced })
    }

    /// Runs until the running flag clears, the dispatcher goes away, or the
    /// frame source loses its connection.
    pub fn run(&self, running: &RunningFlag) -> Result<ProducerStats, Error> {
        info!("Tracking producer started for {}/{}", self.subject, self.marker);
        let mut stats = ProducerStats::default();

        while running.is_running() {
            match self.step() {
                Ok(ProduceOutcome::NoFrame) => thread::sleep(self.idle_poll),
                Ok(outcome) => {
                    stats.frames += 1;
                    match outcome {
                        ProduceOutcome::Occluded => stats.occluded += 1,
                        ProduceOutcome::DiscardedBusy => stats.discarded_busy += 1,
                        ProduceOutcome::Published { replaced } => {
                            stats.published += 1;
                            if replaced {
                                stats.superseded += 1;
                            }
                        }
                        ProduceOutcome::NoFrame => {}
                    }
                }
                Err(Error::ChannelClosed) => {
                    debug!("Target channel closed; producer exiting");
                    break;
                }
                Err(e) if e.is_connection() => return Err(e),
                Err(e) => {
                    warn!("Frame acquisition failed: {e}");
                    thread::sleep(self.idle_poll);
                }
            }
        }

        info!(
            "Tracking producer stopped: {} frames, {} published, {} occluded, {} discarded while moving",
            stats.frames, stats.published, stats.occluded, stats.discarded_busy
        );
        Ok(stats)
    }
}
