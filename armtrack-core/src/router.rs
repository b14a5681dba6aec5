// File: armtrack-core/src/router.rs
//! Turns broker command payloads into grasps on the session.

use std::time::Duration;

use tracing::{debug, info, warn};

use armtrack_common::models::geometry::position;
use armtrack_common::models::{CommandAction, GraspStepKind, RobotCommand, RobotPose, Rpy};
use armtrack_common::traits::Subscription;
use crate::config::{ControllerConfig, GraspConfig};
use crate::grasp::{GraspPlan, GraspReport};
use crate::motion::RunningFlag;
use crate::session::Session;
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Noop,
    /// Malformed or refused payload; nothing moved.
    Skipped(String),
    Executed(GraspReport),
    /// The grasp stopped at this step's unreachable pose.
    Aborted(GraspStepKind),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub received: u64,
    pub executed: u64,
    pub aborted: u64,
    pub skipped: u64,
    pub noop: u64,
}

pub struct CommandRouter {
    home: RobotPose,
    place: RobotPose,
    rotation: Rpy,
    grasp: GraspConfig,
    poll: Duration,
}

impl CommandRouter {
    pub fn from_config(cfg: &ControllerConfig) -> Self {
        Self {
            home: cfg.robot.home_pose(),
            place: cfg.robot.place_pose(),
            rotation: cfg.robot.home_rotation,
            grasp: cfg.grasp.clone(),
            poll: Duration::from_millis(cfg.broker.poll_interval_ms),
        }
    }

    /// `Ok(None)` for a no-op. Out-of-range objects are refused.
    pub fn plan_for(&self, cmd: &RobotCommand) -> Result<Option<GraspPlan>, Error> {
        let (pick, place) = match cmd.action()? {
            CommandAction::Noop => return Ok(None),
            CommandAction::GrabAt(xyz) => (self.pose(xyz), self.place),
            CommandAction::Place { object, target } => {
                for info in [&object, &target] {
                    if !info.inrange {
                        return Err(Error::Broker(format!("'{}' is out of reach", info.name)));
                    }
                }
                (self.pose(object.position), self.pose(target.position))
            }
        };
        Ok(Some(GraspPlan::standard(pick, place, self.home, &self.grasp)))
    }

    /// Parses and runs one payload. Only errors that end the session escape;
    /// everything else becomes an outcome.
    pub fn handle_payload(&self, session: &mut Session, payload: &str) -> Result<RouteOutcome, Error> {
        let plan = match RobotCommand::from_json(payload).and_then(|cmd| self.plan_for(&cmd)) {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                debug!("noop command");
                return Ok(RouteOutcome::Noop);
            }
            Err(e) => {
                warn!("Ignoring command payload: {e}");
                return Ok(RouteOutcome::Skipped(e.to_string()));
            }
        };

        match session.run_grasp(&plan) {
            Ok(report) => Ok(RouteOutcome::Executed(report)),
            Err(Error::SolveFailure { step }) => Ok(RouteOutcome::Aborted(step)),
            Err(e) => Err(e),
        }
    }

    /// Serves commands one at a time until the flag clears or the
    /// subscription closes.
    pub fn serve(
        &self,
        session: &mut Session,
        subscription: &Subscription,
        running: &RunningFlag,
    ) -> Result<RouterStats, Error> {
        info!("Listening for commands on '{}'", subscription.channel());
        let mut stats = RouterStats::default();

        while running.is_running() {
            let payload = match subscription.recv_timeout(self.poll) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    info!("Command subscription ended: {e}");
                    break;
                }
            };
            stats.received += 1;

            match self.handle_payload(session, &payload)? {
                RouteOutcome::Noop => stats.noop += 1,
                RouteOutcome::Skipped(_) => stats.skipped += 1,
                RouteOutcome::Executed(_) => stats.executed += 1,
                RouteOutcome::Aborted(_) => stats.aborted += 1,
            }
        }
        Ok(stats)
    }

    fn pose(&self, xyz: [f64; 3]) -> RobotPose {
        RobotPose::new(position(xyz), self.rotation)
    }
}
