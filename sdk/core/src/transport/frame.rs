//! Frame Protocol
//!
//! Wire format for plugin <-> host messages: length-prefixed UTF-8 JSON.
//!
//! # Frame Format
//!
//! ```text
//! +----------------+------------------------------------------+
//! | Length (4)     | JSON Payload (variable)                  |
//! | big-endian u32 | Envelope                                 |
//! +----------------+------------------------------------------+
//! ```
//!
//! The Length field contains the size of the JSON payload only.
//!
//! # Security
//!
//! - Maximum frame size is enforced to prevent memory exhaustion
//! - Length field is validated before allocating buffer

use serde::Serialize;

use super::TransportError;

/// Default maximum frame size (10 MB)
///
/// This prevents memory exhaustion from malicious or corrupted frames.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Frame header size: 4 bytes length
pub const HEADER_SIZE: usize = 4;

/// Encode a message to a length-prefixed frame
///
/// # Errors
///
/// Returns `TransportError::Serialization` if JSON serialization fails, or
/// `TransportError::FrameTooLarge` if the payload exceeds `max_frame_size`.
pub fn encode<T: Serialize>(msg: &T, max_frame_size: usize) -> Result<Vec<u8>, TransportError> {
    let json = serde_json::to_vec(msg).map_err(|e| TransportError::Serialization(e.to_string()))?;

    if json.len() > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size: json.len(),
            max: max_frame_size,
        });
    }

    let len = u32::try_from(json.len()).map_err(|_| TransportError::FrameTooLarge {
        size: json.len(),
        max: u32::MAX as usize,
    })?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Decoder state machine for streaming frame parsing
///
/// Buffers incoming bytes and yields complete frame payloads. Parsing the
/// payload as JSON is left to the caller so that a malformed body can be
/// told apart from a broken stream.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    max_frame_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder with the default frame size limit
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create a decoder that rejects frames larger than `max_frame_size`
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            max_frame_size,
        }
    }

    /// Append bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        // Compact buffer if we've consumed a lot
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Get the number of bytes available in the buffer
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Try to decode the next frame payload
    ///
    /// Returns:
    /// - `Ok(Some(payload))` if a complete frame was decoded
    /// - `Ok(None)` if more data is needed
    /// - `Err(TransportError::FrameTooLarge)` if the declared length is over the limit
    pub fn decode_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let available = self.available();

        if available < HEADER_SIZE {
            return Ok(None);
        }

        let len_bytes = &self.buffer[self.read_pos..self.read_pos + HEADER_SIZE];
        let len =
            u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

        if len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if available < HEADER_SIZE + len {
            return Ok(None);
        }

        let payload_start = self.read_pos + HEADER_SIZE;
        let payload_end = payload_start + len;
        let payload = self.buffer[payload_start..payload_end].to_vec();

        self.read_pos = payload_end;

        Ok(Some(payload))
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
    }
}
