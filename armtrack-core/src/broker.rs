//! armtrack-core/src/broker.rs
//!
//! In-process publish/subscribe broker carrying JSON command payloads between
//! the decision side and the command router.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace};

use armtrack_common::traits::{MessageBroker, Subscription};
use crate::Error;

/// Each subscriber gets its own unbounded queue. Subscribers whose
/// [`Subscription`] was dropped are pruned on the next publish to that channel.
#[derive(Clone, Default)]
pub struct LocalBroker {
    channels: Arc<Mutex<HashMap<String, Vec<Sender<String>>>>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Drops every subscriber queue; open subscriptions see the broker as closed.
    pub fn close(&self) {
        self.channels.lock().clear();
        debug!("Local broker closed");
    }
}

impl MessageBroker for LocalBroker {
    fn publish(&self, channel: &str, payload: &str) -> Result<usize, Error> {
        let mut channels = self.channels.lock();
        let Some(subs) = channels.get_mut(channel) else {
            trace!("No subscribers on '{channel}'");
            return Ok(0);
        };
        subs.retain(|tx| tx.send(payload.to_string()).is_ok());
        let delivered = subs.len();
        if subs.is_empty() {
            channels.remove(channel);
        }
        trace!("Published to '{channel}' ({delivered} subscriber(s))");
        Ok(delivered)
    }

    fn subscribe(&self, channel: &str) -> Result<Subscription, Error> {
        let (tx, rx) = unbounded();
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        debug!("New subscriber on '{channel}'");
        Ok(Subscription::new(channel, rx))
    }
}
