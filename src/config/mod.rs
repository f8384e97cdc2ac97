//! Configuration management.

mod shell;
mod xdg;

pub use shell::{ConfigError, ShellConfig, ViewEntry, WindowEntry};
pub use xdg::{XdgDirs, APP_DIR};
