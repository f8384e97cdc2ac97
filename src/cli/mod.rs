//! CLI components.

pub mod bridge;

pub use bridge::{run_bridge_mode, Bridge, BridgeInCommand, BridgeOutMessage, ShutdownReason};
