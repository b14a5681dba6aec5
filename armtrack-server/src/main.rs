use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use armtrack_common::models::geometry::position;
use armtrack_common::models::{RobotPose, SceneInfo};
use armtrack_common::traits::{FrameSource, MessageBroker};
use armtrack_core::broker::LocalBroker;
use armtrack_core::grasp::GraspPlan;
use armtrack_core::router::CommandRouter;
use armtrack_core::scene::SceneObserver;
use armtrack_core::{ControllerConfig, Error, Session};

mod devices;
mod stdin_bridge;

use stdin_bridge::SceneSource;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Calibrate the base, then follow the tracked hand.
    Tracking,
    /// Run one pick-and-place at `--pick`.
    Grasp,
    /// Execute commands arriving on the command channel.
    Listen,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "armtrack")]
#[command(author, version, about = "armtrack - motion-capture driven robot arm controller")]
struct Args {
    /// Controller config (JSON). Built-in rig defaults are used if missing.
    #[arg(long, default_value = "armtrack.json")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Tracking)]
    mode: Mode,

    /// Overrides robot.host (and ARMTRACK_ROBOT_HOST).
    #[arg(long)]
    robot_host: Option<String>,

    /// Overrides robot.port (and ARMTRACK_ROBOT_PORT).
    #[arg(long)]
    robot_port: Option<u16>,

    /// Pick position for grasp mode: x,y,z in robot-base meters.
    #[arg(long, value_delimiter = ',', num_args = 3)]
    pick: Option<Vec<f64>>,

    /// Fixed scene (JSON) for free-text requests in listen mode. Without it
    /// the base is calibrated and the live rig is read per request.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Run against simulated devices.
    #[arg(long, default_value = "false")]
    simulate: bool,

    #[arg(long, short = 'v', default_value = "false")]
    verbose: bool,
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "armtrack=debug" } else { "armtrack=info" };
    let filter = EnvFilter::from_default_env().add_directive(level.parse()?);
    let sub = fmt().with_env_filter(filter).with_thread_names(true).finish();
    tracing::subscriber::set_global_default(sub)?;
    Ok(())
}

fn resolve_config(args: &Args) -> anyhow::Result<ControllerConfig> {
    let mut config = ControllerConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Ok(host) = env::var("ARMTRACK_ROBOT_HOST") {
        config.robot.host = host;
    }
    if let Ok(port) = env::var("ARMTRACK_ROBOT_PORT") {
        config.robot.port = port
            .parse()
            .with_context(|| format!("ARMTRACK_ROBOT_PORT={port} is not a port number"))?;
    }
    if let Some(host) = &args.robot_host {
        config.robot.host = host.clone();
    }
    if let Some(port) = args.robot_port {
        config.robot.port = port;
    }

    config.validate()?;
    Ok(config)
}

fn load_scene(path: &Path) -> Result<SceneInfo, Error> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn run_mode(session: &mut Session, frames: Arc<dyn FrameSource>, args: &Args) -> Result<(), Error> {
    session.start()?;

    match args.mode {
        Mode::Tracking => {
            let origin = session.calibrate()?;
            info!("Base origin: {:?}", origin.position());
            let report = session.run_tracking()?;
            info!("Tracking finished: {:?}", report);
        }
        Mode::Grasp => {
            let Some(pick) = args.pick.as_deref() else {
                return Err(Error::Config("--pick x,y,z is required in grasp mode".into()));
            };
            let robot = &session.config().robot;
            let plan = GraspPlan::standard(
                RobotPose::new(position([pick[0], pick[1], pick[2]]), robot.home_rotation),
                robot.place_pose(),
                robot.home_pose(),
                &session.config().grasp,
            );
            let report = session.run_grasp(&plan)?;
            info!("Grasp completed {} steps in {:.2?}", report.completed.len(), report.elapsed);
        }
        Mode::Listen => {
            let channel = session.config().broker.command_channel.clone();
            let broker = LocalBroker::new();
            let subscription = broker.subscribe(&channel)?;
            let running = session.running_flag();

            let scene = match args.scene.as_deref() {
                Some(path) => SceneSource::Fixed(load_scene(path)?),
                None => {
                    let origin = session.calibrate()?;
                    SceneSource::Live(SceneObserver::new(frames, session.config(), origin))
                }
            };
            stdin_bridge::spawn(broker, channel, scene, running.clone())?;

            let router = CommandRouter::from_config(session.config());
            let stats = router.serve(session, &subscription, &running)?;
            info!("Command router finished: {:?}", stats);
        }
    }

    session.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let config = resolve_config(&args)?;
    info!(
        "armtrack starting. mode={:?}, robot={}:{}, simulate={}",
        args.mode, config.robot.host, config.robot.port, args.simulate
    );

    let devices = devices::open(args.simulate, &config)?;
    let frames = devices.frames.clone();
    let mut session = Session::new(config, devices.robot, devices.frames, devices.gripper);

    let running = session.running_flag();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping.");
                running.stop();
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {e}"),
        }
    });

    let result = tokio::task::spawn_blocking(move || run_mode(&mut session, frames, &args)).await?;
    if let Err(e) = result {
        error!("armtrack stopped: {e}");
        return Err(e.into());
    }

    info!("Main finished. Goodbye!");
    Ok(())
}
