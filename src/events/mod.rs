//! Event sources and the namespace registry.
//!
//! - [`EventSource`]: the subscribe/unsubscribe capability the dispatcher binds to
//! - [`Emitter`]: the in-process multi-listener source used by the shell
//! - [`NamespaceRegistry`]: namespace → key → source table
//! - [`EventArg`]: one positional argument of an occurrence

mod args;
mod emitter;
mod registry;
mod source;

pub use args::{diagnostic_args, wire_args, Callback, EventArg};
pub use emitter::Emitter;
pub use registry::{ArcSource, NamespaceRegistry, RegistryEntry};
pub use source::{Channel, EventSource, Listener, Unsubscribe, UnsubscribeError};
