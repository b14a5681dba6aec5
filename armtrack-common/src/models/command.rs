//! Wire format of the commands exchanged over the message broker.
//!
//! Two payload shapes are in use:
//!
//! ```json
//! {"function_name": "grab_object", "position": [0.59, 0.04, 0.27]}
//! {"function_name": "grab_object",
//!  "object": {"name": "apple", "inrange": true, "position": [0.59, 0.04, 0.27]},
//!  "target": {"name": "Palm", "inrange": true, "position": [0.0, 0.6, 0.25]}}
//! ```
//!
//! `noop` carries no payload.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::scene::ObjectInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionName {
    GrabObject,
    Noop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotCommand {
    pub function_name: FunctionName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectInfo>,
}

/// What a command asks the arm to do, once the payload variant is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    GrabAt([f64; 3]),
    Place { object: ObjectInfo, target: ObjectInfo },
    Noop,
}

impl RobotCommand {
    pub fn noop() -> Self {
        Self {
            function_name: FunctionName::Noop,
            position: None,
            object: None,
            target: None,
        }
    }

    pub fn grab_at(position: [f64; 3]) -> Self {
        Self {
            function_name: FunctionName::GrabObject,
            position: Some(position),
            object: None,
            target: None,
        }
    }

    pub fn place(object: ObjectInfo, target: ObjectInfo) -> Self {
        Self {
            function_name: FunctionName::GrabObject,
            position: None,
            object: Some(object),
            target: Some(target),
        }
    }

    pub fn from_json(payload: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Resolves the payload. The object/target form wins over a bare position
    /// when both are present.
    pub fn action(&self) -> Result<CommandAction, Error> {
        match self.function_name {
            FunctionName::Noop => Ok(CommandAction::Noop),
            FunctionName::GrabObject => match (&self.object, &self.target, self.position) {
                (Some(object), Some(target), _) => Ok(CommandAction::Place {
                    object: object.clone(),
                    target: target.clone(),
                }),
                (_, _, Some(position)) => Ok(CommandAction::GrabAt(position)),
                _ => Err(Error::Broker(
                    "grab_object needs either `position` or both `object` and `target`".into(),
                )),
            },
        }
    }
}
