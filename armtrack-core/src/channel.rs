// File: armtrack-core/src/channel.rs
//! Hand-off of targets from the tracking producer to the motion dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::transform::Target;
use crate::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelPolicy {
    /// Single slot; a new target replaces one the dispatcher has not taken yet.
    #[default]
    Latest,
    /// Unbounded, order preserving. Every target is eventually dispatched.
    Fifo,
}

pub fn target_channel(policy: ChannelPolicy) -> (TargetSender, TargetReceiver) {
    let (tx, rx) = match policy {
        ChannelPolicy::Latest => bounded(1),
        ChannelPolicy::Fifo => unbounded(),
    };
    let stale = (policy == ChannelPolicy::Latest).then(|| rx.clone());
    let receiver_alive = Arc::new(AtomicBool::new(true));
    (
        TargetSender {
            tx,
            stale,
            receiver_alive: receiver_alive.clone(),
        },
        TargetReceiver { rx, receiver_alive },
    )
}

#[derive(Debug)]
pub struct TargetSender {
    tx: Sender<Target>,
    // Latest only: lets the producer pull the unconsumed target out of the slot.
    stale: Option<Receiver<Target>>,
    // The stale handle keeps the channel connected, so the receiver's drop
    // is tracked separately.
    receiver_alive: Arc<AtomicBool>,
}

impl TargetSender {
    /// Queues `target`. Returns `true` when it replaced a target the
    /// dispatcher never saw.
    /// Fails with `ChannelClosed` once the receiver has been dropped.
    pub fn push(&self, target: Target) -> Result<bool, Error> {
        if !self.receiver_alive.load(Ordering::Acquire) {
            return Err(Error::ChannelClosed);
        }
        let mut pending = target;
        let mut replaced = false;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return Ok(replaced),
                Err(TrySendError::Full(t)) => {
                    pending = t;
                    if let Some(stale) = &self.stale {
                        if stale.try_recv().is_ok() {
                            trace!("Dropped stale target in favour of a newer one");
                            replaced = true;
                        }
                    }
                }
                Err(TrySendError::Disconnected(_)) => return Err(Error::ChannelClosed),
            }
        }
    }
}

#[derive(Debug)]
pub struct TargetReceiver {
    rx: Receiver<Target>,
    receiver_alive: Arc<AtomicBool>,
}

impl Drop for TargetReceiver {
    fn drop(&mut self) {
        self.receiver_alive.store(false, Ordering::Release);
    }
}

impl TargetReceiver {
    /// `Ok(None)` on timeout, `Err(ChannelClosed)` once the producer is gone
    /// and nothing is left to drain.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Target>, Error> {
        match self.rx.recv_timeout(timeout) {
            Ok(target) => Ok(Some(target)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::ChannelClosed),
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armtrack_common::models::geometry::position;
    use armtrack_common::models::RobotBaseOrigin;
    use crate::transform::CoordinateTransformer;

    const SHORT: Duration = Duration::from_millis(10);

    fn target(x: f64) -> Target {
        CoordinateTransformer::new(1.0, 0.0)
            .transform(&position([x, 1.0, 1.0]), &RobotBaseOrigin::zero())
            .unwrap()
    }

    #[test]
    fn latest_delivers_only_the_newest_of_a_burst() {
        let (tx, rx) = target_channel(ChannelPolicy::Latest);
        assert!(!tx.push(target(1.0)).unwrap());
        for x in 2..=5 {
            assert!(tx.push(target(x as f64)).unwrap());
        }

        let got = rx.recv_timeout(SHORT).unwrap().unwrap();
        assert_eq!(got.position().x, 5.0);
        assert!(rx.recv_timeout(SHORT).unwrap().is_none());
    }

    #[test]
    fn fifo_delivers_the_whole_burst_in_order() {
        let (tx, rx) = target_channel(ChannelPolicy::Fifo);
        for x in 1..=5 {
            assert!(!tx.push(target(x as f64)).unwrap());
        }
        assert_eq!(rx.pending(), 5);

        let xs: Vec<f64> = std::iter::from_fn(|| rx.recv_timeout(SHORT).unwrap())
            .map(|t| t.position().x)
            .collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn receiver_reports_closed_after_sender_drops() {
        let (tx, rx) = target_channel(ChannelPolicy::Fifo);
        tx.push(target(1.0)).unwrap();
        drop(tx);

        assert!(rx.recv_timeout(SHORT).unwrap().is_some());
        assert!(matches!(rx.recv_timeout(SHORT), Err(Error::ChannelClosed)));
    }

    #[test]
    fn fifo_push_fails_once_receiver_is_gone() {
        let (tx, rx) = target_channel(ChannelPolicy::Fifo);
        drop(rx);
        assert!(matches!(tx.push(target(1.0)), Err(Error::ChannelClosed)));
    }

    #[test]
    fn latest_push_fails_once_receiver_is_gone() {
        let (tx, rx) = target_channel(ChannelPolicy::Latest);
        assert!(!tx.push(target(1.0)).unwrap());
        drop(rx);

        assert!(matches!(tx.push(target(2.0)), Err(Error::ChannelClosed)));
        assert!(matches!(tx.push(target(3.0)), Err(Error::ChannelClosed)));
    }
}
