//! Console input for listen mode: JSON lines are published as-is, anything
//! else is treated as a request for the reasoner.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use armtrack_common::models::SceneInfo;
use armtrack_common::Error;
use armtrack_common::traits::MessageBroker;
use armtrack_core::broker::LocalBroker;
use armtrack_core::decision::decide_and_publish;
use armtrack_core::motion::RunningFlag;
use armtrack_core::scene::SceneObserver;
use armtrack_core::sim::KeywordReasoner;

/// What the reasoner is told about the rig.
pub enum SceneSource {
    Fixed(SceneInfo),
    Live(SceneObserver),
}

impl SceneSource {
    fn current(&self) -> Result<SceneInfo, Error> {
        match self {
            SceneSource::Fixed(scene) => Ok(scene.clone()),
            SceneSource::Live(observer) => observer.snapshot(),
        }
    }
}

pub fn spawn(
    broker: LocalBroker,
    channel: String,
    scene: SceneSource,
    running: RunningFlag,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("armtrack-stdin".to_string())
        .spawn(move || {
            let reasoner = KeywordReasoner::default();
            println!("Listening on '{channel}'. Type a command JSON, a request, or 'quit'.");

            let stdin = io::stdin();
            let mut lines = stdin.lock().lines();
            while running.is_running() {
                print!("armtrack> ");
                let _ = io::stdout().flush();

                let line = match lines.next() {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        warn!("Error reading from stdin: {e}");
                        break;
                    }
                    None => break,
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "quit" {
                    break;
                }

                if trimmed.starts_with('{') {
                    match broker.publish(&channel, trimmed) {
                        Ok(n) => debug!("Forwarded command to {n} subscriber(s)"),
                        Err(e) => warn!("Could not publish command: {e}"),
                    }
                } else {
                    let answered = scene.current().and_then(|snapshot| {
                        debug!("Scene: {:?}", snapshot);
                        decide_and_publish(&reasoner, &broker, &channel, trimmed, &snapshot)
                    });
                    if let Err(e) = answered {
                        warn!("Could not answer request: {e}");
                    }
                }
            }

            // End of input ends the listening session.
            running.stop();
        })
}
