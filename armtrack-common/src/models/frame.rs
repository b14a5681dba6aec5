use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::models::geometry::{position, Position};

/// One capture sample for a named subject: marker name -> position in the
/// sensor's native units (millimeters for the rig we use).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFrame {
    pub subject: String,
    pub captured_at: DateTime<Utc>,
    markers: HashMap<String, Position>,
}

impl MarkerFrame {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            captured_at: Utc::now(),
            markers: HashMap::new(),
        }
    }

    /// Builder form, handy for replay data and tests.
    pub fn with_marker(mut self, name: impl Into<String>, xyz: [f64; 3]) -> Self {
        self.markers.insert(name.into(), position(xyz));
        self
    }

    pub fn marker(&self, name: &str) -> Option<Position> {
        self.markers.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<Position, Error> {
        self.marker(name).ok_or_else(|| Error::MissingMarker {
            subject: self.subject.clone(),
            marker: name.to_string(),
        })
    }
}

/// Robot mounting point expressed in sensor coordinates. Produced once per
/// session by the base calibrator and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotBaseOrigin(Position);

impl RobotBaseOrigin {
    pub fn new(p: Position) -> Self {
        Self(p)
    }

    pub fn zero() -> Self {
        Self(Position::zeros())
    }

    pub fn position(&self) -> Position {
        self.0
    }
}
