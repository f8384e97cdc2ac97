//! Binds every registered event source to the broadcast path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::events::{
    diagnostic_args, Channel, EventArg, Listener, NamespaceRegistry, Unsubscribe, UnsubscribeError,
};

/// Error type for dispatcher operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Events are already registered")]
    AlreadyRegistered,
}

/// A live binding between one event source and the broadcaster.
#[derive(Debug)]
pub struct Subscription {
    namespace: String,
    key: String,
    channel: Channel,
    unsubscribe: Unsubscribe,
}

impl Subscription {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Detach from the source. Consumes the subscription.
    pub fn unsubscribe(self) -> Result<(), UnsubscribeError> {
        self.unsubscribe.invoke()
    }
}

/// Every subscription created by one registration.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.subscriptions.iter().map(|s| s.channel.clone()).collect()
    }
}

impl IntoIterator for SubscriptionSet {
    type Item = Subscription;
    type IntoIter = std::vec::IntoIter<Subscription>;

    fn into_iter(self) -> Self::IntoIter {
        self.subscriptions.into_iter()
    }
}

/// Subscribes once to every source of a registry.
///
/// Each source gets an adapter that logs the occurrence and hands the
/// original arguments to the [`Broadcaster`]. The channel is derived once
/// per source when the adapter is built.
pub struct Dispatcher {
    broadcaster: Arc<Broadcaster>,
    registered: AtomicBool,
}

impl Dispatcher {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            broadcaster,
            registered: AtomicBool::new(false),
        }
    }

    /// Subscribe to every (namespace, key, source) triple of `registry`.
    ///
    /// Only the first call subscribes; later calls return
    /// [`DispatchError::AlreadyRegistered`].
    pub fn register(&self, registry: &NamespaceRegistry) -> Result<SubscriptionSet, DispatchError> {
        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::AlreadyRegistered);
        }

        let mut subscriptions = Vec::with_capacity(registry.len());
        for entry in registry.triples() {
            let channel = entry.channel();
            let unsubscribe = entry.source.subscribe(self.adapter(channel.clone()));
            debug!(channel = %channel, "subscribed");
            subscriptions.push(Subscription {
                namespace: entry.namespace.to_string(),
                key: entry.key.to_string(),
                channel,
                unsubscribe,
            });
        }

        info!(channels = subscriptions.len(), "event channels registered");
        Ok(SubscriptionSet { subscriptions })
    }

    fn adapter(&self, channel: Channel) -> Listener {
        let broadcaster = Arc::clone(&self.broadcaster);
        Arc::new(move |args: &[EventArg]| {
            let shown = Value::Array(diagnostic_args(args));
            debug!(channel = %channel, args = %shown, "[ipc-event]");
            let report = broadcaster.broadcast(&channel, args);
            debug!(
                channel = %channel,
                surfaces = report.surfaces,
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "broadcast complete"
            );
        })
    }
}
