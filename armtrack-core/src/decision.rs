// File: armtrack-core/src/decision.rs
//! Asks a reasoner what to do about a request and publishes the vetted
//! command for the router.

use tracing::{info, warn};

use armtrack_common::models::{CommandAction, RobotCommand, SceneInfo};
use armtrack_common::traits::{MessageBroker, Reasoner};
use crate::Error;

/// Keeps a `grab_object` only when both names resolve to in-range objects
/// of `scene`; positions are taken from the scene, not from the reasoner.
/// Anything else is downgraded to `noop`.
pub fn vet_command(cmd: RobotCommand, scene: &SceneInfo) -> RobotCommand {
    match cmd.action() {
        Ok(CommandAction::Place { object, target }) => {
            let resolved = (scene.find(&object.name), scene.find(&target.name));
            match resolved {
                (Some(o), Some(t)) if o.inrange && t.inrange => {
                    RobotCommand::place(o.clone(), t.clone())
                }
                _ => {
                    warn!(
                        "Refusing to grab '{}' for '{}': not in the scene or out of range",
                        object.name, target.name
                    );
                    RobotCommand::noop()
                }
            }
        }
        Ok(CommandAction::GrabAt(_)) | Ok(CommandAction::Noop) => cmd,
        Err(e) => {
            warn!("Reasoner produced an unusable command: {e}");
            RobotCommand::noop()
        }
    }
}

pub fn decide_and_publish(
    reasoner: &dyn Reasoner,
    broker: &dyn MessageBroker,
    channel: &str,
    prompt: &str,
    scene: &SceneInfo,
) -> Result<RobotCommand, Error> {
    let cmd = vet_command(reasoner.decide(prompt, scene)?, scene);
    let payload = cmd.to_json()?;
    let receivers = broker.publish(channel, &payload)?;
    info!("Published {payload} on '{channel}' to {receivers} subscriber(s)");
    Ok(cmd)
}
