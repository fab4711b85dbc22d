//! Unix Socket Transport
//!
//! Client side of the plugin connection. The host listens; each plugin
//! process dials exactly one connection and keeps it for its lifetime.
//!
//! # Socket Location
//!
//! Development: `$XDG_RUNTIME_DIR/lantern-dev.sock`
//! Stable: `$XDG_RUNTIME_DIR/lantern.sock`
//! Fallback dir: `/tmp/lantern-$UID/`

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixStream;

use super::config::TransportConfig;
use super::stream::{FrameReader, FrameWriter};
use super::TransportError;

/// Connect to the host socket at `path`
///
/// A `timeout` of zero waits indefinitely.
pub async fn connect(path: &Path, timeout: Duration) -> Result<UnixStream, TransportError> {
    let attempt = UnixStream::connect(path);
    let result = if timeout.is_zero() {
        attempt.await
    } else {
        tokio::time::timeout(timeout, attempt).await.map_err(|_| {
            TransportError::ConnectionFailed(format!(
                "Timed out after {timeout:?} connecting to {}",
                path.display()
            ))
        })?
    };

    result.map_err(|e| {
        TransportError::ConnectionFailed(format!("Failed to connect to {}: {e}", path.display()))
    })
}

/// Connect to the first reachable candidate socket
///
/// Returns the stream together with the path that accepted the connection.
pub async fn connect_discovered(
    config: &TransportConfig,
) -> Result<(UnixStream, PathBuf), TransportError> {
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    let mut failures = Vec::new();

    for path in config.candidate_socket_paths() {
        match connect(&path, timeout).await {
            Ok(stream) => {
                tracing::info!(path = %path.display(), "Connected to host");
                return Ok((stream, path));
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Socket candidate unavailable");
                failures.push(e.to_string());
            }
        }
    }

    Err(TransportError::ConnectionFailed(failures.join("; ")))
}

/// Split a connected stream into a frame reader and writer
pub fn split(
    stream: UnixStream,
    max_frame_size: usize,
) -> (FrameReader<OwnedReadHalf>, FrameWriter) {
    let (read_half, write_half) = stream.into_split();
    (
        FrameReader::new(read_half, max_frame_size),
        FrameWriter::new(write_half, max_frame_size),
    )
}
