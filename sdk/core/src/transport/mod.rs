//! Transport Layer for plugin <-> host IPC
//!
//! - `frame`: length-prefixed JSON codec
//! - `stream`: async frame reader/writer over socket halves
//! - `unix_socket`: connecting to the host and endpoint discovery
//! - `config`: socket location and frame limits
//!
//! # Security
//!
//! - Frame length is validated before any payload allocation
//! - No network exposure (Unix domain sockets only)

pub mod config;
pub mod error;
pub mod frame;
pub mod stream;
#[cfg(unix)]
pub mod unix_socket;

// Re-exports for convenience
pub use config::TransportConfig;
pub use error::TransportError;
pub use frame::{encode, FrameDecoder, MAX_FRAME_SIZE};
pub use stream::{spawn_writer, FrameReader, FrameWriter, WriterHandle};
