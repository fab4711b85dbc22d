//! Transport Errors
//!
//! Failures at the socket/framing level. Every variant here is fatal to the
//! connection: the receive loop ends and the runtime proceeds to shutdown.

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the host failed (socket absent, refused, or timed out)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// A frame exceeds the configured maximum size
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared or encoded payload size
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// The peer closed the stream in the middle of a frame
    #[error("Truncated frame: {buffered} bytes buffered at EOF")]
    Truncated {
        /// Bytes of the partial frame left in the buffer
        buffered: usize,
    },

    /// Message serialization error on the outbound path
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Too many consecutive malformed frames from the peer
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// IO error from the underlying socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this error means the peer went away (as opposed to sending garbage)
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::Truncated { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
