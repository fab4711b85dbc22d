//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::protocol::{ProtocolError, RpcError};
use crate::transport::TransportError;

/// Errors surfaced by the plugin runtime and its public API
#[derive(Debug, Error)]
pub enum PluginError {
    /// Socket or framing failure; fatal to the connection
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed envelope
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The host answered an outbound request with an error
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The registration handshake did not succeed
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SIGINT/SIGTERM handlers could not be installed
    #[error("Failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl PluginError {
    /// Whether the connection to the host is gone
    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_disconnect())
    }
}

/// Result alias used throughout the SDK
pub type Result<T, E = PluginError> = std::result::Result<T, E>;
