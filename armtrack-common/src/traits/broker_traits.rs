use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::Error;

/// Publish/subscribe transport for JSON command payloads.
pub trait MessageBroker: Send + Sync {
    /// Returns how many subscribers received the payload.
    fn publish(&self, channel: &str, payload: &str) -> Result<usize, Error>;

    fn subscribe(&self, channel: &str) -> Result<Subscription, Error>;
}

/// Receiving end of a broker subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    rx: Receiver<String>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, rx: Receiver<String>) -> Self {
        Self {
            channel: channel.into(),
            rx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// `Ok(None)` on timeout, `Err` once the broker side is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<String>, Error> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Broker(format!(
                "subscription to '{}' closed",
                self.channel
            ))),
        }
    }

    pub fn try_recv(&self) -> Result<Option<String>, Error> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Broker(format!(
                "subscription to '{}' closed",
                self.channel
            ))),
        }
    }
}
