//! UI surface topology as seen by the broadcaster.
//!
//! A [`Surface`] is a top-level window; a [`ChildSurface`] is a view embedded
//! in its content area. Both are owned and destroyed by UI lifecycle code.
//! This crate only reads their state, and always immediately before use.

mod endpoint;
mod window;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{Channel, EventArg};

pub use endpoint::{outbox, ChannelEndpoint, Outbox, OutboxReceiver, SurfaceMessage};
pub use window::{EmbeddedView, Window, WindowError, WindowSet};

/// Error type for message endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("Endpoint disconnected")]
    Disconnected,

    #[error("Send failed: {0}")]
    Failed(String),
}

/// Messaging endpoint of a surface.
pub trait MessageEndpoint: Send + Sync {
    /// Deliver one message on `channel`.
    fn send(&self, channel: &Channel, args: &[EventArg]) -> Result<(), SendError>;
}

/// Kind discriminant of an embedded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    /// Web content view. The only kind that receives broadcasts.
    #[default]
    Web,
    /// Native view (toolbars, placeholders).
    Native,
}

impl ChildKind {
    pub fn is_broadcast_target(self) -> bool {
        matches!(self, ChildKind::Web)
    }
}

/// A top-level UI window.
pub trait Surface: Send + Sync {
    fn label(&self) -> &str;

    /// Destroyed is terminal.
    fn is_destroyed(&self) -> bool;

    /// Current endpoint; `None` once the content has gone away.
    fn endpoint(&self) -> Option<Arc<dyn MessageEndpoint>>;

    /// Embedded surfaces in content order.
    fn children(&self) -> Vec<Arc<dyn ChildSurface>>;
}

/// A surface embedded within a window's content area.
pub trait ChildSurface: Send + Sync {
    fn label(&self) -> &str;

    fn kind(&self) -> ChildKind;

    fn is_destroyed(&self) -> bool;

    fn endpoint(&self) -> Option<Arc<dyn MessageEndpoint>>;
}

/// Pull-based query for the currently live windows.
///
/// Implementations must compute the list on every call and leave out
/// windows that are destroyed at query time.
pub trait SurfaceEnumerator: Send + Sync {
    fn live_surfaces(&self) -> Vec<Arc<dyn Surface>>;
}
