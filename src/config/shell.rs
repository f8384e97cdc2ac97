//! Shell configuration file handling.
//!
//! Loads the optional JSON config with the log filter and the windows to
//! open at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::XdgDirs;
use crate::surface::{
    ChildKind, EmbeddedView, MessageEndpoint, Outbox, Window, WindowError, WindowSet,
};

/// Error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// A view to embed in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub label: String,

    #[serde(default)]
    pub kind: ChildKind,
}

impl ViewEntry {
    /// Create the view with an endpoint on `outbox`.
    pub fn build(&self, outbox: &Outbox) -> Arc<EmbeddedView> {
        let endpoint: Arc<dyn MessageEndpoint> = Arc::new(outbox.endpoint(&self.label));
        EmbeddedView::new(&self.label, self.kind, Some(endpoint))
    }
}

/// A window to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub label: String,

    /// Whether the window's own content can receive messages.
    #[serde(default = "default_endpoint")]
    pub endpoint: bool,

    #[serde(default)]
    pub views: Vec<ViewEntry>,
}

fn default_endpoint() -> bool {
    true
}

impl WindowEntry {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            endpoint: true,
            views: Vec::new(),
        }
    }

    /// Create the window with its views, wired to `outbox`, and add it to `set`.
    pub fn open(&self, set: &WindowSet, outbox: &Outbox) -> Result<Arc<Window>, WindowError> {
        let endpoint: Option<Arc<dyn MessageEndpoint>> = if self.endpoint {
            Some(Arc::new(outbox.endpoint(&self.label)))
        } else {
            None
        };
        let window = Window::new(&self.label, endpoint);
        for view in &self.views {
            window.attach(view.build(outbox))?;
        }
        set.open(Arc::clone(&window))?;
        Ok(window)
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    /// Windows opened at startup.
    #[serde(default)]
    pub windows: Vec<WindowEntry>,
}

impl ShellConfig {
    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from `path`, falling back to defaults only when the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from_path(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Get the default configuration path.
    pub fn default_config_path() -> PathBuf {
        XdgDirs::new().config_file()
    }

    /// Open every configured window. Stops at the first duplicate label.
    pub fn open_windows(&self, set: &WindowSet, outbox: &Outbox) -> Result<usize, WindowError> {
        for entry in &self.windows {
            entry.open(set, outbox)?;
        }
        Ok(self.windows.len())
    }

    /// Sample configuration with one tabbed main window.
    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self {
            log_filter: Some("shellcast=info".to_string()),
            windows: vec![WindowEntry {
                views: vec![
                    ViewEntry {
                        label: "tab-1".into(),
                        kind: ChildKind::Web,
                    },
                    ViewEntry {
                        label: "sidebar".into(),
                        kind: ChildKind::Native,
                    },
                ],
                ..WindowEntry::new("main")
            }],
        }
    }
}
