//! XDG Base Directory support.

use std::path::{Path, PathBuf};

/// Application directory name under each XDG base.
pub const APP_DIR: &str = "shellcast";

/// XDG directory paths for shellcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdgDirs {
    /// Config directory (~/.config/shellcast or XDG_CONFIG_HOME/shellcast)
    pub config: PathBuf,
}

impl XdgDirs {
    /// Get XDG directories, respecting environment variables.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::resolve(std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from), &home)
    }

    /// Resolve from an explicit base override and a home directory.
    ///
    /// An empty override is ignored.
    pub fn resolve(config_home: Option<PathBuf>, home: &Path) -> Self {
        let base = config_home
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| home.join(".config"));

        Self {
            config: base.join(APP_DIR),
        }
    }

    /// Default location of the shell config file.
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
