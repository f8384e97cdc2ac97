//! Bridge mode for driving the shell from another process.
//!
//! Provides an NDJSON protocol over stdio: the host opens and destroys
//! windows, fires domain events, and sees every resulting delivery.
//! All messages are JSON objects separated by newlines. Logs go to stderr.
//!
//! ## Protocol
//!
//! ### Outbound Messages (stdout)
//! ```json
//! {"type": "ready", "version": "0.1.0", "windows": 1, "channels": 11}
//! {"type": "delivered", "surface": "main", "channel": "ui:onMaximized", "args": [true], ...}
//! {"type": "broadcast", "channel": "ui:onMaximized", "listeners": 1, "delivered": 2}
//! {"type": "windows", "windows": [...]}
//! {"type": "channels", "channels": ["applicationMenu:newPageAction", ...]}
//! {"type": "shutdown", "reason": "eof", "unsubscribed": 11, "failed": 0}
//! {"type": "error", "message": "..."}
//! ```
//!
//! ### Inbound Commands (stdin)
//! ```json
//! {"type": "open_window", "label": "main", "views": [{"label": "tab-1", "kind": "web"}]}
//! {"type": "attach_view", "window": "main", "label": "tab-2"}
//! {"type": "destroy_view", "window": "main", "label": "tab-2"}
//! {"type": "destroy_window", "label": "main"}
//! {"type": "emit", "namespace": "ui", "key": "onMaximized", "args": [true]}
//! {"type": "list_windows"}
//! {"type": "list_channels"}
//! {"type": "shutdown"}
//! ```

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::{ShellConfig, ViewEntry, WindowEntry};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::domains::DomainHub;
use crate::events::{wire_args, Channel, EventArg};
use crate::shutdown::{ShutdownHook, ShutdownSummary};
use crate::signals;
use crate::surface::{
    outbox, ChildKind, ChildSurface, Outbox, OutboxReceiver, Surface, SurfaceEnumerator,
    SurfaceMessage, WindowError, WindowSet,
};

/// Error type for bridge startup.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid window layout: {0}")]
    Layout(#[from] WindowError),

    #[error("Failed to register event channels: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Outbound message types sent to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeOutMessage {
    /// Bridge is ready to receive commands.
    Ready {
        version: String,
        windows: usize,
        channels: usize,
    },
    /// One surface received a message.
    Delivered {
        surface: String,
        channel: String,
        args: Vec<Value>,
        at: DateTime<Utc>,
    },
    /// An emitted event finished broadcasting.
    Broadcast {
        channel: String,
        listeners: usize,
        delivered: usize,
    },
    /// Live window topology.
    Windows { windows: Vec<WindowStatus> },
    /// Registered event channels.
    Channels { channels: Vec<String> },
    /// Subscriptions were torn down and the bridge is exiting.
    Shutdown {
        reason: ShutdownReason,
        #[serde(flatten)]
        summary: ShutdownSummary,
    },
    /// Error occurred.
    Error { message: String },
}

impl BridgeOutMessage {
    fn error(e: impl std::fmt::Display) -> Self {
        BridgeOutMessage::Error {
            message: e.to_string(),
        }
    }
}

impl From<SurfaceMessage> for BridgeOutMessage {
    fn from(msg: SurfaceMessage) -> Self {
        BridgeOutMessage::Delivered {
            surface: msg.surface,
            channel: msg.channel.to_string(),
            args: wire_args(&msg.args),
            at: msg.delivered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    pub label: String,
    pub id: String,
    pub endpoint: bool,
    pub views: Vec<ViewStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewStatus {
    pub label: String,
    pub kind: ChildKind,
    pub destroyed: bool,
}

/// Why the bridge stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    /// Stdin was closed.
    Eof,
    /// A `shutdown` command arrived.
    Command,
    /// A termination signal arrived.
    Signal,
}

/// Inbound command types from the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeInCommand {
    /// Open a window with optional embedded views.
    OpenWindow(WindowEntry),
    /// Embed a view into an open window.
    AttachView {
        window: String,
        label: String,
        #[serde(default)]
        kind: ChildKind,
    },
    /// Destroy a window and its views.
    DestroyWindow { label: String },
    /// Destroy one view.
    DestroyView { window: String, label: String },
    /// Fire a domain event.
    Emit {
        namespace: String,
        key: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Report live windows.
    ListWindows,
    /// Report registered channels.
    ListChannels,
    /// Shutdown the bridge.
    Shutdown,
}

/// Bridge state.
pub struct Bridge {
    windows: Arc<WindowSet>,
    hub: DomainHub,
    outbox: Outbox,
    deliveries: OutboxReceiver,
    channels: Vec<Channel>,
}

impl Bridge {
    /// Open the configured windows and register every domain channel.
    ///
    /// Returns the bridge together with the hook that tears the
    /// registrations down.
    pub fn new(config: &ShellConfig) -> Result<(Self, ShutdownHook), BridgeError> {
        let windows = Arc::new(WindowSet::new());
        let (outbox, deliveries) = outbox();
        config.open_windows(&windows, &outbox)?;

        let hub = DomainHub::new();
        let broadcaster = Broadcaster::new(Arc::clone(&windows) as Arc<dyn SurfaceEnumerator>);
        let dispatcher = Dispatcher::new(Arc::new(broadcaster));
        let subscriptions = dispatcher.register(&hub.registry())?;
        let channels = subscriptions.channels();

        let bridge = Self {
            windows,
            hub,
            outbox,
            deliveries,
            channels,
        };
        Ok((bridge, ShutdownHook::new(subscriptions)))
    }

    pub fn ready(&self) -> BridgeOutMessage {
        BridgeOutMessage::Ready {
            version: env!("CARGO_PKG_VERSION").to_string(),
            windows: self.windows.live_surfaces().len(),
            channels: self.channels.len(),
        }
    }

    /// Handle one command and return the messages to send back.
    ///
    /// `shutdown` is handled by the run loop and produces nothing here.
    pub fn handle(&mut self, cmd: BridgeInCommand) -> Vec<BridgeOutMessage> {
        match cmd {
            BridgeInCommand::OpenWindow(entry) => match entry.open(&self.windows, &self.outbox) {
                Ok(_) => vec![self.list_windows()],
                Err(e) => vec![BridgeOutMessage::error(e)],
            },
            BridgeInCommand::AttachView {
                window,
                label,
                kind,
            } => match self.windows.get(&window) {
                Some(win) => match win.attach(ViewEntry { label, kind }.build(&self.outbox)) {
                    Ok(()) => vec![self.list_windows()],
                    Err(e) => vec![BridgeOutMessage::error(e)],
                },
                None => vec![BridgeOutMessage::error(WindowError::WindowNotFound(window))],
            },
            BridgeInCommand::DestroyWindow { label } => match self.windows.destroy(&label) {
                Ok(()) => {
                    self.windows.prune();
                    vec![self.list_windows()]
                }
                Err(e) => vec![BridgeOutMessage::error(e)],
            },
            BridgeInCommand::DestroyView { window, label } => {
                match self.windows.destroy_view(&window, &label) {
                    Ok(()) => vec![self.list_windows()],
                    Err(e) => vec![BridgeOutMessage::error(e)],
                }
            }
            BridgeInCommand::Emit {
                namespace,
                key,
                args,
            } => self.handle_emit(&namespace, &key, args),
            BridgeInCommand::ListWindows => vec![self.list_windows()],
            BridgeInCommand::ListChannels => vec![self.list_channels()],
            BridgeInCommand::Shutdown => Vec::new(),
        }
    }

    fn handle_emit(
        &mut self,
        namespace: &str,
        key: &str,
        args: Vec<Value>,
    ) -> Vec<BridgeOutMessage> {
        let args: Vec<EventArg> = args.into_iter().map(EventArg::from).collect();
        let listeners = match self.hub.emit(namespace, key, &args) {
            Ok(n) => n,
            Err(e) => return vec![BridgeOutMessage::error(e)],
        };

        let mut out: Vec<BridgeOutMessage> = self
            .deliveries
            .drain()
            .into_iter()
            .map(BridgeOutMessage::from)
            .collect();
        debug!(namespace = %namespace, key = %key, delivered = out.len(), "bridge emit");
        out.push(BridgeOutMessage::Broadcast {
            channel: Channel::new(namespace, key).to_string(),
            listeners,
            delivered: out.len(),
        });
        out
    }

    fn list_windows(&self) -> BridgeOutMessage {
        let windows = self
            .windows
            .windows()
            .into_iter()
            .filter(|w| !w.is_destroyed())
            .map(|w| WindowStatus {
                label: w.label().to_string(),
                id: w.id().to_string(),
                endpoint: w.endpoint().is_some(),
                views: w
                    .views()
                    .iter()
                    .map(|v| ViewStatus {
                        label: v.label().to_string(),
                        kind: v.kind(),
                        destroyed: v.is_destroyed(),
                    })
                    .collect(),
            })
            .collect();
        BridgeOutMessage::Windows { windows }
    }

    fn list_channels(&self) -> BridgeOutMessage {
        BridgeOutMessage::Channels {
            channels: self.channels.iter().map(Channel::to_string).collect(),
        }
    }

    /// Tear down subscriptions and stop every event source.
    pub fn shutdown(&self, hook: ShutdownHook, reason: ShutdownReason) -> BridgeOutMessage {
        debug!(pending = hook.pending(), "firing shutdown hook");
        let report = hook.fire();
        self.hub.close();
        info!(reason = ?reason, clean = report.is_clean(), "bridge shutting down");
        BridgeOutMessage::Shutdown {
            reason,
            summary: report.summary(),
        }
    }
}

/// Send a message to the host.
fn emit(msg: &BridgeOutMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!(error = %e, "failed to serialize bridge message"),
    }
}

/// Decode one raw input line. Blank lines yield `None`.
fn parse_line(line: &[u8]) -> Option<Result<BridgeInCommand, String>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(format!("Invalid UTF-8: {}", e))),
    };
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {}", e)))
}

/// Run in bridge mode (NDJSON over stdio).
pub async fn run_bridge_mode(config: &ShellConfig) -> anyhow::Result<()> {
    let (mut bridge, hook) = Bridge::new(config)?;
    emit(&bridge.ready());

    // Set up stdin reader in a separate thread
    let (tx, mut rx) = mpsc::channel::<Result<BridgeInCommand, String>>(32);

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut reader = BufReader::new(stdin.lock());
        let mut line = Vec::new();

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let Some(cmd) = parse_line(&line) else {
                        continue;
                    };
                    if tx.blocking_send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
    });

    let termination = signals::wait_for_termination();
    tokio::pin!(termination);
    let mut signals_armed = true;

    // Main event loop
    let reason = loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                None => break ShutdownReason::Eof,
                Some(Ok(BridgeInCommand::Shutdown)) => break ShutdownReason::Command,
                Some(Ok(cmd)) => {
                    for msg in bridge.handle(cmd) {
                        emit(&msg);
                    }
                }
                Some(Err(message)) => emit(&BridgeOutMessage::Error { message }),
            },
            res = &mut termination, if signals_armed => match res {
                Ok(()) => break ShutdownReason::Signal,
                Err(e) => {
                    warn!(error = %e, "signal handlers unavailable");
                    signals_armed = false;
                }
            },
        }
    };

    emit(&bridge.shutdown(hook, reason));
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for bridge mode.
    //!
    //! Coverage:
    //! - Outbound frame serialization and inbound command parsing
    //! - Raw line decoding (blank, non-UTF-8, invalid JSON)
    //! - Command handling against a live window topology
    //! - Shutdown teardown

    use super::*;
    use serde_json::json;

    fn bridge_with(config: &ShellConfig) -> (Bridge, ShutdownHook) {
        Bridge::new(config).unwrap()
    }

    fn command(value: Value) -> BridgeInCommand {
        serde_json::from_value(value).unwrap()
    }

    // =========================================================================
    // Protocol Tests
    // =========================================================================

    #[test]
    fn test_serialize_out_message() {
        let msg = BridgeOutMessage::Broadcast {
            channel: "ui:onMaximized".to_string(),
            listeners: 1,
            delivered: 2,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "broadcast",
                "channel": "ui:onMaximized",
                "listeners": 1,
                "delivered": 2
            })
        );
    }

    #[test]
    fn test_serialize_shutdown_flattens_summary() {
        let msg = BridgeOutMessage::Shutdown {
            reason: ShutdownReason::Eof,
            summary: ShutdownSummary {
                unsubscribed: 3,
                failed: 0,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({"type": "shutdown", "reason": "eof", "unsubscribed": 3, "failed": 0})
        );
    }

    #[test]
    fn test_deserialize_open_window() {
        let cmd = command(json!({
            "type": "open_window",
            "label": "main",
            "views": [{"label": "tab-1"}, {"label": "bar", "kind": "native"}]
        }));
        match cmd {
            BridgeInCommand::OpenWindow(entry) => {
                assert_eq!(entry.label, "main");
                assert!(entry.endpoint);
                assert_eq!(entry.views[1].kind, ChildKind::Native);
            }
            other => panic!("Expected OpenWindow, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_emit_without_args() {
        let cmd = command(json!({"type": "emit", "namespace": "ui", "key": "onFullScreen"}));
        assert!(matches!(cmd, BridgeInCommand::Emit { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn test_deserialize_shutdown() {
        let cmd = command(json!({"type": "shutdown"}));
        assert!(matches!(cmd, BridgeInCommand::Shutdown));
    }

    #[test]
    fn test_deserialize_unknown_type_fails() {
        let result: Result<BridgeInCommand, _> =
            serde_json::from_value(json!({"type": "prompt", "text": "hi"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_line_skips_blank_lines() {
        assert!(parse_line(b"\n").is_none());
        assert!(parse_line(b"   \r\n").is_none());
    }

    #[test]
    fn test_parse_line_reports_bad_input() {
        match parse_line(b"\xff\xfe\n") {
            Some(Err(message)) => assert!(message.starts_with("Invalid UTF-8"), "{}", message),
            other => panic!("Expected UTF-8 error, got {:?}", other),
        }
        match parse_line(b"not json\n") {
            Some(Err(message)) => assert!(message.starts_with("Invalid JSON"), "{}", message),
            other => panic!("Expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_accepts_crlf_command() {
        let cmd = parse_line(b"{\"type\": \"list_windows\"}\r\n");
        assert!(matches!(cmd, Some(Ok(BridgeInCommand::ListWindows))));
    }

    // =========================================================================
    // Session Tests
    // =========================================================================

    #[test]
    fn test_ready_counts_topology() {
        let (bridge, hook) = bridge_with(&ShellConfig::sample());
        match bridge.ready() {
            BridgeOutMessage::Ready {
                windows, channels, ..
            } => {
                assert_eq!(windows, 1);
                assert_eq!(channels, hook.pending());
            }
            other => panic!("Expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_emit_delivers_to_window_and_web_views() {
        let (mut bridge, _hook) = bridge_with(&ShellConfig::sample());

        let out = bridge.handle(command(json!({
            "type": "emit", "namespace": "ui", "key": "onMaximized", "args": [true]
        })));

        let surfaces: Vec<&str> = out
            .iter()
            .filter_map(|m| match m {
                BridgeOutMessage::Delivered { surface, args, .. } => {
                    assert_eq!(args, &vec![json!(true)]);
                    Some(surface.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(surfaces, vec!["main", "tab-1"]);
        assert!(matches!(
            out.last(),
            Some(BridgeOutMessage::Broadcast { listeners: 1, delivered: 2, .. })
        ));
    }

    #[test]
    fn test_emit_after_destroy_skips_window() {
        let (mut bridge, _hook) = bridge_with(&ShellConfig::sample());
        bridge.handle(command(json!({"type": "open_window", "label": "aux"})));
        bridge.handle(command(json!({"type": "destroy_window", "label": "main"})));

        let out = bridge.handle(command(json!({
            "type": "emit", "namespace": "updater", "key": "updateReady"
        })));

        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], BridgeOutMessage::Delivered { surface, .. } if surface == "aux"));
    }

    #[test]
    fn test_attach_and_destroy_view() {
        let (mut bridge, _hook) = bridge_with(&ShellConfig::sample());
        bridge.handle(command(json!({"type": "attach_view", "window": "main", "label": "tab-2"})));
        bridge.handle(command(json!({"type": "destroy_view", "window": "main", "label": "tab-1"})));

        let out = bridge.handle(command(json!({
            "type": "emit", "namespace": "ui", "key": "onFullScreen", "args": [false]
        })));

        let surfaces: Vec<String> = out
            .into_iter()
            .filter_map(|m| match m {
                BridgeOutMessage::Delivered { surface, .. } => Some(surface),
                _ => None,
            })
            .collect();
        assert_eq!(surfaces, vec!["main", "tab-2"]);
    }

    #[test]
    fn test_reattached_view_can_be_destroyed_again() {
        let (mut bridge, _hook) = bridge_with(&ShellConfig::default());
        bridge.handle(command(json!({"type": "open_window", "label": "main"})));
        let attach = json!({"type": "attach_view", "window": "main", "label": "tab"});
        let destroy = json!({"type": "destroy_view", "window": "main", "label": "tab"});

        bridge.handle(command(attach.clone()));
        let dup = bridge.handle(command(attach.clone()));
        assert!(matches!(dup.as_slice(), [BridgeOutMessage::Error { .. }]));

        bridge.handle(command(destroy.clone()));
        bridge.handle(command(attach));
        let out = bridge.handle(command(destroy));
        assert!(matches!(out.as_slice(), [BridgeOutMessage::Windows { .. }]));

        let out = bridge.handle(command(json!({
            "type": "emit", "namespace": "ui", "key": "onMaximized"
        })));
        let surfaces: Vec<String> = out
            .into_iter()
            .filter_map(|m| match m {
                BridgeOutMessage::Delivered { surface, .. } => Some(surface),
                _ => None,
            })
            .collect();
        assert_eq!(surfaces, vec!["main"]);
    }

    #[test]
    fn test_unknown_targets_report_errors() {
        let (mut bridge, _hook) = bridge_with(&ShellConfig::default());

        for cmd in [
            json!({"type": "destroy_window", "label": "ghost"}),
            json!({"type": "attach_view", "window": "ghost", "label": "tab"}),
            json!({"type": "emit", "namespace": "ui", "key": "onExploded"}),
        ] {
            let out = bridge.handle(command(cmd));
            assert!(matches!(out.as_slice(), [BridgeOutMessage::Error { .. }]));
        }
    }

    #[test]
    fn test_duplicate_open_window_is_error() {
        let (mut bridge, _hook) = bridge_with(&ShellConfig::sample());
        let out = bridge.handle(command(json!({"type": "open_window", "label": "main"})));
        assert!(matches!(
            out.as_slice(),
            [BridgeOutMessage::Error { message }] if message.contains("main")
        ));
    }

    #[test]
    fn test_list_channels_matches_registration() {
        let (mut bridge, hook) = bridge_with(&ShellConfig::default());
        match bridge.handle(BridgeInCommand::ListChannels).as_slice() {
            [BridgeOutMessage::Channels { channels }] => {
                assert_eq!(channels.len(), hook.pending());
                assert_eq!(channels[0], "applicationMenu:newPageAction");
            }
            other => panic!("Expected Channels, got {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_unsubscribes_everything() {
        let (mut bridge, hook) = bridge_with(&ShellConfig::sample());
        let pending = hook.pending();

        match bridge.shutdown(hook, ShutdownReason::Command) {
            BridgeOutMessage::Shutdown { reason, summary } => {
                assert_eq!(reason, ShutdownReason::Command);
                assert_eq!(summary.unsubscribed, pending);
                assert_eq!(summary.failed, 0);
            }
            other => panic!("Expected Shutdown, got {:?}", other),
        }

        let out = bridge.handle(command(json!({
            "type": "emit", "namespace": "ui", "key": "onMaximized"
        })));
        assert!(matches!(
            out.as_slice(),
            [BridgeOutMessage::Broadcast { listeners: 0, delivered: 0, .. }]
        ));
    }
}
