use crate::error::Error;
use crate::models::command::RobotCommand;
use crate::models::scene::SceneInfo;

/// Turns a free-text request into a grab/no-op decision.
pub trait Reasoner: Send + Sync {
    fn decide(&self, prompt: &str, scene: &SceneInfo) -> Result<RobotCommand, Error>;
}
