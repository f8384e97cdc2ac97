//! Event source capability and subscription handles.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::EventArg;

/// Listener invoked synchronously for every occurrence of an event.
pub type Listener = Arc<dyn Fn(&[EventArg]) + Send + Sync>;

/// Error type for unsubscribe handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsubscribeError {
    #[error("Event source is closed")]
    SourceClosed,

    #[error("Unsubscribe failed: {0}")]
    Failed(String),

    #[error("Unsubscribe panicked: {0}")]
    Panicked(String),
}

/// A subscribable producer of one domain event kind.
///
/// The dispatcher is polymorphic over this trait only, never over the
/// concrete sources behind it.
pub trait EventSource: Send + Sync {
    /// Attach a listener and return the handle that detaches it.
    fn subscribe(&self, listener: Listener) -> Unsubscribe;
}

type UnsubscribeFn = Box<dyn FnOnce() -> Result<(), UnsubscribeError> + Send>;

/// Handle returned by [`EventSource::subscribe`].
///
/// Consumed by [`Unsubscribe::invoke`], so it can run at most once.
pub struct Unsubscribe {
    inner: UnsubscribeFn,
}

impl Unsubscribe {
    /// Create a handle from a closure.
    pub fn new(f: impl FnOnce() -> Result<(), UnsubscribeError> + Send + 'static) -> Self {
        Self { inner: Box::new(f) }
    }

    /// Detach the listener.
    pub fn invoke(self) -> Result<(), UnsubscribeError> {
        (self.inner)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe(..)")
    }
}

/// Channel name addressing one event kind: `namespace:key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(Arc<str>);

impl Channel {
    /// Derive the channel for a namespace/key pair.
    pub fn new(namespace: &str, key: &str) -> Self {
        Self(Arc::from(format!("{}:{}", namespace, key)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Channel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
