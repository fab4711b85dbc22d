//! Transport Configuration
//!
//! Socket location and framing limits for the plugin connection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::frame::MAX_FRAME_SIZE;

/// File name of the development host socket
pub const DEV_SOCKET_NAME: &str = "lantern-dev.sock";

/// File name of the stable host socket
pub const SOCKET_NAME: &str = "lantern.sock";

/// Transport configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Explicit socket path (None = discover under the runtime directory)
    pub socket_path: Option<PathBuf>,

    /// Connection timeout in milliseconds (0 = no timeout)
    ///
    /// How long to wait when connecting to the host.
    pub connect_timeout_ms: u64,

    /// Largest accepted frame payload in bytes, inbound and outbound
    pub max_frame_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            connect_timeout_ms: 5000,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl TransportConfig {
    /// Create configuration pinned to a specific socket
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Socket paths to try, in order
    ///
    /// An explicit path is the only candidate. Otherwise the development
    /// socket is tried first and the stable socket second.
    #[must_use]
    pub fn candidate_socket_paths(&self) -> Vec<PathBuf> {
        match &self.socket_path {
            Some(path) => vec![path.clone()],
            None => vec![dev_socket_path(), default_socket_path()],
        }
    }
}

/// Directory holding the host sockets
///
/// Uses the XDG runtime directory if available, otherwise /tmp/lantern-$UID/
#[cfg(unix)]
#[must_use]
pub fn runtime_dir() -> PathBuf {
    if let Some(dir) = dirs::runtime_dir() {
        dir
    } else {
        // SAFETY: getuid has no preconditions and cannot fail.
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/lantern-{uid}"))
    }
}

/// Path of the development host socket
#[cfg(unix)]
#[must_use]
pub fn dev_socket_path() -> PathBuf {
    runtime_dir().join(DEV_SOCKET_NAME)
}

/// Path of the stable host socket
#[cfg(unix)]
#[must_use]
pub fn default_socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_NAME)
}
