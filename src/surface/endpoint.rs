//! Channel-backed message endpoints.
//!
//! Every endpoint created from one [`Outbox`] feeds the same receiver, which
//! the host drains to forward deliveries to the real UI process.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::{MessageEndpoint, SendError};
use crate::events::{Channel, EventArg};

/// A message as delivered to one surface.
#[derive(Debug, Clone)]
pub struct SurfaceMessage {
    /// Label of the receiving surface.
    pub surface: String,
    pub channel: Channel,
    pub args: Vec<EventArg>,
    pub delivered_at: DateTime<Utc>,
}

/// Factory for endpoints sharing one receiver.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<SurfaceMessage>,
}

impl Outbox {
    /// Create an endpoint that tags deliveries with `surface`.
    pub fn endpoint(&self, surface: impl Into<String>) -> ChannelEndpoint {
        ChannelEndpoint {
            surface: surface.into(),
            tx: self.tx.clone(),
        }
    }
}

/// Receiving half of an [`Outbox`].
pub struct OutboxReceiver {
    rx: mpsc::UnboundedReceiver<SurfaceMessage>,
}

impl OutboxReceiver {
    /// Take everything queued right now.
    pub fn drain(&mut self) -> Vec<SurfaceMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

/// Create a new outbox.
pub fn outbox() -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, OutboxReceiver { rx })
}

/// Endpoint that queues deliveries into an [`Outbox`].
#[derive(Clone)]
pub struct ChannelEndpoint {
    surface: String,
    tx: mpsc::UnboundedSender<SurfaceMessage>,
}

impl MessageEndpoint for ChannelEndpoint {
    fn send(&self, channel: &Channel, args: &[EventArg]) -> Result<(), SendError> {
        self.tx
            .send(SurfaceMessage {
                surface: self.surface.clone(),
                channel: channel.clone(),
                args: args.to_vec(),
                delivered_at: Utc::now(),
            })
            .map_err(|_| SendError::Disconnected)
    }
}
