//! Logging setup
//!
//! Plugins write protocol frames on a socket, never on stdout, but the host
//! usually captures stdout and stderr anyway. Logs therefore go to stderr
//! and stay at `warn` unless debugging is switched on.

use tracing_subscriber::EnvFilter;

/// Build the filter directive used when `RUST_LOG` is unset
///
/// `extra_targets` are additional crates (typically the plugin binary) that
/// get the same level as the SDK.
#[must_use]
pub fn default_directive(debug: bool, extra_targets: &[&str]) -> String {
    let level = if debug { "debug" } else { "warn" };
    std::iter::once("lantern_sdk")
        .chain(extra_targets.iter().copied())
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `debug` when set. Calling this twice is harmless;
/// the second call leaves the first subscriber in place.
pub fn init_logging(debug: bool, extra_targets: &[&str]) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug, extra_targets)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(debug)
        .try_init();
}
