//! Shellcast - event broadcast for desktop shells
//!
//! Runs the shell's event dispatch in bridge mode: NDJSON on stdio.

use std::path::PathBuf;

use clap::Parser;
use shellcast::{cli, DomainHub, ShellConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Shellcast - forward main-process events to every live window
#[derive(Parser, Debug)]
#[command(name = "shellcast")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/shellcast/config.json)
    #[arg(long, env = "SHELLCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Print the registered event channels and exit
    #[arg(long)]
    list_channels: bool,

    /// Working directory (like git -C)
    #[arg(short = 'C', long, visible_alias = "directory")]
    cwd: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Change working directory if specified (do this early)
    if let Some(cwd) = &args.cwd {
        std::env::set_current_dir(cwd)?;
    }

    if args.list_channels {
        for channel in DomainHub::new().registry().channels() {
            println!("{}", channel);
        }
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(ShellConfig::default_config_path);
    let config = ShellConfig::load_or_default(&config_path)?;

    init_tracing(&args, &config);
    tracing::debug!(path = %config_path.display(), windows = config.windows.len(), "config loaded");

    // Single event loop: occurrences are handled one at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(cli::run_bridge_mode(&config))
}

/// Initialize tracing with stderr output; stdout carries the protocol.
fn init_tracing(args: &Args, config: &ShellConfig) {
    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        config.log_filter.as_deref().unwrap_or("warn") // Quiet by default
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if args.debug || args.verbose {
        tracing::info!("Debug logging enabled");
    }
}
