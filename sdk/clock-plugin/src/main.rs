//! Lantern Clock Plugin
//!
//! Shows the current time in a handful of formats, copies the selected one
//! to the clipboard, and keeps a status badge with the time up to date.
//!
//! # Usage
//!
//! ```bash
//! # Discover the host socket under $XDG_RUNTIME_DIR
//! lantern-clock-plugin
//!
//! # Explicit socket and faster badge updates
//! lantern-clock-plugin --socket-path /tmp/lantern.sock --interval-secs 5
//!
//! # Verbose logging (stderr)
//! lantern-clock-plugin --debug
//! RUST_LOG=lantern_sdk=trace lantern-clock-plugin
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

mod plugin;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lantern_sdk::config::{default_config_path, load_config_from_path};
use lantern_sdk::{init_logging, ConfigOverrides};
use tracing::info;

/// Lantern Clock Plugin - current time in common formats
#[derive(Parser, Debug)]
#[command(name = "lantern-clock-plugin")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host socket path (skips discovery)
    #[arg(short = 's', long, env = "LANTERN_SOCKET", value_name = "PATH")]
    socket_path: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short = 'd', long)]
    debug: bool,

    /// Seconds between status badge updates
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(ref path) = args.config {
        anyhow::ensure!(path.exists(), "Config file {} does not exist", path.display());
    }
    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(path) = args.socket_path {
        overrides = overrides.with_socket_path(path);
    }
    if args.debug {
        overrides = overrides.with_debug(true);
    }
    overrides.apply(&mut config);

    init_logging(config.runtime.debug, &["lantern_clock_plugin"]);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source,
        "Clock plugin starting"
    );

    plugin::build(config, Duration::from_secs(args.interval_secs))
        .run()
        .await
        .context("Clock plugin stopped with an error")?;

    info!("Clock plugin stopped");
    Ok(())
}
