//! TOML Configuration File Support
//!
//! Plugins are usually launched by a supervisor with environment variables
//! only, but a shared file at `~/.config/lantern/plugin.toml` is honoured too.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! socket_path = "/run/user/1000/lantern.sock"
//! connect_timeout_ms = 5000
//! max_frame_size = 10485760
//!
//! [runtime]
//! register_timeout_ms = 10000
//! shutdown_grace_ms = 2000
//! max_protocol_errors = 8
//! debug = false
//! ```
//!
//! # Environment Variables
//!
//! - `LANTERN_SOCKET`: socket path
//! - `LANTERN_CONNECT_TIMEOUT`: connect timeout in ms
//! - `LANTERN_MAX_FRAME_SIZE`: frame size limit in bytes
//! - `LANTERN_REGISTER_TIMEOUT`: handshake timeout in ms (0 disables)
//! - `LANTERN_SHUTDOWN_GRACE`: background task grace period in ms
//! - `LANTERN_PLUGIN_DEBUG`: "1" or "true" to surface failures on stderr

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::config::TransportConfig;

/// Smallest accepted `max_frame_size`
const MIN_FRAME_SIZE: usize = 1024;

/// Largest accepted `max_frame_size`
const MAX_FRAME_SIZE_LIMIT: usize = 256 * 1024 * 1024;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Runtime behaviour settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Registration handshake timeout in milliseconds (0 = wait forever)
    pub register_timeout_ms: u64,
    /// How long background tasks get to stop after shutdown begins
    pub shutdown_grace_ms: u64,
    /// Consecutive malformed frames tolerated before the connection is dropped
    pub max_protocol_errors: u32,
    /// Surface failures on stderr
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            register_timeout_ms: 10_000,
            shutdown_grace_ms: 2_000,
            max_protocol_errors: 8,
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Registration timeout, `None` when disabled
    #[must_use]
    pub fn register_timeout(&self) -> Option<Duration> {
        (self.register_timeout_ms > 0).then(|| Duration::from_millis(self.register_timeout_ms))
    }

    /// Grace period for background tasks at shutdown
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Complete plugin configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginConfig {
    /// Socket and framing settings
    pub transport: TransportConfig,
    /// Runtime behaviour
    pub runtime: RuntimeConfig,
    /// Config file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
    /// Highest-priority source that contributed a value
    pub source: ConfigSource,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            runtime: RuntimeConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl PluginConfig {
    /// Configuration connecting to a fixed socket, defaults otherwise
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        Self {
            transport: TransportConfig::with_socket_path(path),
            ..Default::default()
        }
    }

    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        load_config_from_path(default_config_path())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.transport.max_frame_size;
        if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE_LIMIT).contains(&size) {
            return Err(ConfigError::ValidationError(format!(
                "max_frame_size must be between {MIN_FRAME_SIZE} and {MAX_FRAME_SIZE_LIMIT}, got {size}"
            )));
        }
        if self.runtime.max_protocol_errors == 0 {
            return Err(ConfigError::ValidationError(
                "max_protocol_errors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Unix socket path
    pub socket_path: Option<String>,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Frame size limit in bytes
    pub max_frame_size: Option<usize>,
}

/// Runtime section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeToml {
    /// Registration handshake timeout in milliseconds
    pub register_timeout_ms: Option<u64>,
    /// Background task grace period in milliseconds
    pub shutdown_grace_ms: Option<u64>,
    /// Consecutive malformed frames tolerated
    pub max_protocol_errors: Option<u32>,
    /// Surface failures on stderr
    pub debug: Option<bool>,
}

/// Root of `plugin.toml`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginToml {
    /// `[transport]` section
    pub transport: TransportToml,
    /// `[runtime]` section
    pub runtime: RuntimeToml,
}

// =============================================================================
// Loading
// =============================================================================

/// Default config file location (`$XDG_CONFIG_HOME/lantern/plugin.toml`)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lantern").join("plugin.toml"))
}

/// Load configuration from `path` (if it exists) and the environment
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<PluginConfig, ConfigError> {
    let mut config = PluginConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: PluginToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::debug!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut PluginConfig, toml: &PluginToml) {
    if let Some(ref path) = toml.transport.socket_path {
        config.transport.socket_path = Some(PathBuf::from(path));
    }
    if let Some(ms) = toml.transport.connect_timeout_ms {
        config.transport.connect_timeout_ms = ms;
    }
    if let Some(size) = toml.transport.max_frame_size {
        config.transport.max_frame_size = size;
    }

    if let Some(ms) = toml.runtime.register_timeout_ms {
        config.runtime.register_timeout_ms = ms;
    }
    if let Some(ms) = toml.runtime.shutdown_grace_ms {
        config.runtime.shutdown_grace_ms = ms;
    }
    if let Some(count) = toml.runtime.max_protocol_errors {
        config.runtime.max_protocol_errors = count;
    }
    if let Some(debug) = toml.runtime.debug {
        config.runtime.debug = debug;
    }
}

/// Apply environment overrides, reading variables through `get`
fn apply_env_config<F>(config: &mut PluginConfig, get: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = get("LANTERN_SOCKET").filter(|p| !p.is_empty()) {
        config.transport.socket_path = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = get("LANTERN_CONNECT_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.transport.connect_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(size) = get("LANTERN_MAX_FRAME_SIZE").and_then(|v| v.parse().ok()) {
        config.transport.max_frame_size = size;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = get("LANTERN_REGISTER_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.runtime.register_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = get("LANTERN_SHUTDOWN_GRACE").and_then(|v| v.parse().ok()) {
        config.runtime.shutdown_grace_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(flag) = get("LANTERN_PLUGIN_DEBUG") {
        config.runtime.debug = flag == "1" || flag.eq_ignore_ascii_case("true");
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Socket path
    pub socket_path: Option<PathBuf>,
    /// Debug flag (only applied when set)
    pub debug: Option<bool>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the socket path
    #[must_use]
    pub fn with_socket_path(mut self, path: PathBuf) -> Self {
        self.socket_path = Some(path);
        self
    }

    /// Override the debug flag
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Apply the overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut PluginConfig) {
        if let Some(ref path) = self.socket_path {
            config.transport.socket_path = Some(path.clone());
            config.source = ConfigSource::Cli;
        }
        if let Some(debug) = self.debug {
            config.runtime.debug = debug;
            config.source = ConfigSource::Cli;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = PluginConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source, ConfigSource::Default);
        assert_eq!(
            config.runtime.register_timeout(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[transport]
socket_path = "/tmp/test-lantern.sock"
max_frame_size = 4096

[runtime]
shutdown_grace_ms = 250
debug = true
"#
        )
        .unwrap();

        let mut config = PluginConfig::default();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let toml_config: PluginToml = toml::from_str(&content).unwrap();
        apply_toml_config(&mut config, &toml_config);

        assert_eq!(
            config.transport.socket_path,
            Some(PathBuf::from("/tmp/test-lantern.sock"))
        );
        assert_eq!(config.transport.max_frame_size, 4096);
        assert_eq!(config.transport.connect_timeout_ms, 5000);
        assert_eq!(config.runtime.shutdown_grace_ms, 250);
        assert!(config.runtime.debug);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/lantern/plugin.toml")))
                .unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[transport\nsocket_path = ").unwrap();

        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LANTERN_SOCKET", "/tmp/env.sock"),
            ("LANTERN_REGISTER_TIMEOUT", "0"),
            ("LANTERN_PLUGIN_DEBUG", "TRUE"),
            ("LANTERN_CONNECT_TIMEOUT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = PluginConfig::default();
        apply_env_config(&mut config, |key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(
            config.transport.socket_path,
            Some(PathBuf::from("/tmp/env.sock"))
        );
        assert_eq!(config.runtime.register_timeout(), None);
        assert!(config.runtime.debug);
        assert_eq!(config.transport.connect_timeout_ms, 5000);
        assert_eq!(config.source, ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = PluginConfig::with_socket_path("/tmp/file.sock");
        ConfigOverrides::new()
            .with_socket_path(PathBuf::from("/tmp/cli.sock"))
            .with_debug(true)
            .apply(&mut config);

        assert_eq!(
            config.transport.socket_path,
            Some(PathBuf::from("/tmp/cli.sock"))
        );
        assert!(config.runtime.debug);
        assert_eq!(config.source, ConfigSource::Cli);
    }

    #[test]
    fn test_validation_rejects_tiny_frames() {
        let mut config = PluginConfig::default();
        config.transport.max_frame_size = 16;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = PluginConfig::default();
        config.runtime.max_protocol_errors = 0;
        assert!(config.validate().is_err());
    }
}
