//! Shellcast Library
//!
//! Forwards events raised by main-process collaborators to every live UI
//! surface of a desktop shell.
//!
//! ## Main Components
//!
//! - [`events`] - Event sources, emitters, and the namespace registry
//! - [`surface`] - Window/view topology and message endpoints
//! - [`broadcast`] - Fan-out of one occurrence to every live surface
//! - [`dispatcher`] - Binds every registered source to the broadcaster
//! - [`shutdown`] - Unsubscribes everything at process termination
//! - [`domains`] - The shell's built-in event domains
//! - [`config`] - Configuration and XDG paths
//! - [`cli`] - NDJSON bridge mode
//!
//! ## Quick Start
//!
//! ```ignore
//! use shellcast::{Broadcaster, Dispatcher, DomainHub, ShutdownHook, WindowSet};
//!
//! let windows = Arc::new(WindowSet::new());
//! let hub = DomainHub::new();
//! let dispatcher = Dispatcher::new(Arc::new(Broadcaster::new(windows.clone())));
//! let hook = ShutdownHook::new(dispatcher.register(&hub.registry())?);
//! tokio::spawn(hook.arm(async { let _ = wait_for_termination().await; }));
//! ```

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod domains;
pub mod events;
pub mod shutdown;
pub mod signals;
pub mod surface;

// Re-export commonly used types
pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::{ConfigError, ShellConfig, XdgDirs};
pub use dispatcher::{DispatchError, Dispatcher, Subscription, SubscriptionSet};
pub use domains::{DomainHub, EventDomain, HubError};
pub use events::{
    diagnostic_args, Channel, Emitter, EventArg, EventSource, Listener, NamespaceRegistry,
    Unsubscribe, UnsubscribeError,
};
pub use shutdown::{ShutdownHook, ShutdownReport, ShutdownSummary};
pub use signals::wait_for_termination;
pub use surface::{
    ChildKind, ChildSurface, MessageEndpoint, SendError, Surface, SurfaceEnumerator, Window,
    WindowSet,
};
