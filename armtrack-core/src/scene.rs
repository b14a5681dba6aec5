// File: armtrack-core/src/scene.rs
//! Live scene snapshots for the reasoning side, read from the capture rig.

use std::sync::Arc;

use tracing::debug;

use armtrack_common::models::{ObjectInfo, Position, RobotBaseOrigin, SceneInfo, UserInfo};
use armtrack_common::traits::FrameSource;
use crate::config::ControllerConfig;
use crate::transform::CoordinateTransformer;
use crate::Error;

pub struct SceneObserver {
    frames: Arc<dyn FrameSource>,
    // Object positions are reported where the object is, so no tool offset.
    transformer: CoordinateTransformer,
    origin: RobotBaseOrigin,
    hand_subject: String,
    hand_marker: String,
    hand_label: String,
    objects: Vec<String>,
    marker: String,
    reach: f64,
}

impl SceneObserver {
    pub fn new(frames: Arc<dyn FrameSource>, cfg: &ControllerConfig, origin: RobotBaseOrigin) -> Self {
        Self {
            frames,
            transformer: CoordinateTransformer::new(cfg.tracking.unit_scale, 0.0),
            origin,
            hand_subject: cfg.tracking.subject.clone(),
            hand_marker: cfg.tracking.marker.clone(),
            hand_label: cfg.scene.hand_label.clone(),
            objects: cfg.scene.objects.clone(),
            marker: cfg.scene.marker.clone(),
            reach: cfg.scene.reach,
        }
    }

    /// Objects currently visible, in robot-base meters. A visible hand is
    /// listed under the hand label and sets `palm_up`.
    pub fn snapshot(&self) -> Result<SceneInfo, Error> {
        self.frames.acquire_frame()?;

        let mut objects = Vec::with_capacity(self.objects.len() + 1);
        for subject in &self.objects {
            match self.locate(subject, &self.marker)? {
                Some(p) => objects.push(self.object(subject, p)),
                None => debug!("{subject} is not visible"),
            }
        }
        let hand = self.locate(&self.hand_subject, &self.hand_marker)?;
        if let Some(p) = hand {
            objects.push(self.object(&self.hand_label, p));
        }
        let palm_up = hand.is_some();

        Ok(SceneInfo {
            objects,
            user: UserInfo { palm_up },
        })
    }

    fn object(&self, name: &str, p: Position) -> ObjectInfo {
        ObjectInfo {
            name: name.to_string(),
            inrange: p.norm() <= self.reach,
            position: [p.x, p.y, p.z],
        }
    }

    fn locate(&self, subject: &str, marker: &str) -> Result<Option<Position>, Error> {
        let raw = match self
            .frames
            .subject_markers(subject)
            .and_then(|frame| frame.require(marker))
        {
            Ok(raw) => raw,
            Err(Error::MissingMarker { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(self
            .transformer
            .transform(&raw, &self.origin)
            .map(|t| t.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armtrack_common::models::geometry::position;
    use armtrack_common::models::MarkerFrame;
    use mockall::mock;

    mock! {
        Frames {}
        impl FrameSource for Frames {
            fn acquire_frame(&self) -> Result<bool, Error>;
            fn subject_markers(&self, subject: &str) -> Result<MarkerFrame, Error>;
        }
    }

    fn observer(frames: MockFrames) -> SceneObserver {
        SceneObserver::new(
            Arc::new(frames),
            &ControllerConfig::default(),
            RobotBaseOrigin::new(position([100.0, 0.0, 0.0])),
        )
    }

    #[test]
    fn snapshot_reports_visible_objects_relative_to_the_base() {
        let mut frames = MockFrames::new();
        frames.expect_acquire_frame().times(1).returning(|| Ok(true));
        frames.expect_subject_markers().returning(|subject| {
            let frame = MarkerFrame::new(subject);
            Ok(match subject {
                "apple" => frame.with_marker("Center", [600.0, 100.0, 270.0]),
                "banana" => frame.with_marker("Center", [1600.0, 0.0, 270.0]),
                // Occluded: all-zero sample.
                "orange" => frame.with_marker("Center", [0.0, 0.0, 0.0]),
                "Hand" => frame.with_marker("Center", [400.0, 0.0, 300.0]),
                _ => frame,
            })
        });

        let scene = observer(frames).snapshot().unwrap();

        assert_eq!(scene.objects.len(), 3);
        let apple = scene.find("apple").unwrap();
        assert!(apple.inrange);
        assert_relative_eq!(apple.position[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(apple.position[2], 0.27, epsilon = 1e-12);
        assert!(!scene.find("banana").unwrap().inrange);
        assert!(scene.find("orange").is_none());
        assert!(scene.user.palm_up);
        let palm = scene.find("Palm").unwrap();
        assert_relative_eq!(palm.position[0], 0.3, epsilon = 1e-12);
        assert!(palm.inrange);
    }

    #[test]
    fn missing_hand_means_palm_down() {
        let mut frames = MockFrames::new();
        frames.expect_acquire_frame().returning(|| Ok(false));
        frames.expect_subject_markers().returning(|subject| {
            if subject == "Hand" {
                Err(Error::MissingMarker {
                    subject: subject.to_string(),
                    marker: "Center".to_string(),
                })
            } else {
                Ok(MarkerFrame::new(subject))
            }
        });

        let scene = observer(frames).snapshot().unwrap();
        assert!(scene.objects.is_empty());
        assert!(!scene.user.palm_up);
    }

    #[test]
    fn connection_loss_is_reported() {
        let mut frames = MockFrames::new();
        frames
            .expect_acquire_frame()
            .returning(|| Err(Error::Connection("capture server gone".into())));

        assert!(observer(frames).snapshot().unwrap_err().is_connection());
    }
}
