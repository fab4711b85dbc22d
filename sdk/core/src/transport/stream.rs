//! Async frame reader and writer over split socket halves
//!
//! The reader is owned by exactly one task (the receive loop). The writer is
//! owned by a dedicated writer task; everything else sends encoded frames to
//! it through a [`WriterHandle`]. A frame, once queued, is written in full
//! even if the caller that queued it is dropped, so the byte stream never
//! carries a partial frame followed by another one.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::frame::{encode, FrameDecoder};
use super::TransportError;

/// Size of the scratch buffer used for each socket read
const READ_CHUNK_SIZE: usize = 8192;

/// Frames waiting for the writer task before senders are made to wait
const WRITE_QUEUE_CAPACITY: usize = 100;

/// Reads length-prefixed frames from a byte stream
pub struct FrameReader<R> {
    inner: R,
    decoder: FrameDecoder,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a read half, rejecting frames larger than `max_frame_size`
    pub fn new(inner: R, max_frame_size: usize) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_max_frame_size(max_frame_size),
            buf: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Read the next complete frame payload
    ///
    /// Returns `Ok(None)` on a clean EOF (the stream ended on a frame
    /// boundary). EOF inside a frame is `TransportError::Truncated`.
    ///
    /// Cancel safe: bytes already read stay buffered in the decoder.
    pub async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(payload) = self.decoder.decode_frame()? {
                return Ok(Some(payload));
            }

            let n = self.inner.read(&mut self.buf).await?;
            if n == 0 {
                let buffered = self.decoder.available();
                if buffered == 0 {
                    return Ok(None);
                }
                return Err(TransportError::Truncated { buffered });
            }
            self.decoder.push(&self.buf[..n]);
        }
    }
}

/// Writes length-prefixed frames to a byte stream
pub struct FrameWriter {
    inner: Box<dyn AsyncWrite + Send + Unpin>,
    max_frame_size: usize,
}

impl FrameWriter {
    /// Wrap a write half, rejecting frames larger than `max_frame_size`
    pub fn new<W>(inner: W, max_frame_size: usize) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(inner),
            max_frame_size,
        }
    }

    /// Encode and write one message as a single frame
    ///
    /// The frame is fully encoded before the first byte is written, so an
    /// oversized or unserializable message never leaves a partial frame on
    /// the wire.
    pub async fn write_message<T: Serialize>(&mut self, msg: &T) -> Result<(), TransportError> {
        let data = encode(msg, self.max_frame_size)?;
        self.write_frame(&data).await
    }

    /// Write an already encoded frame (header included)
    ///
    /// Not cancel safe: dropping this future mid-write leaves a partial
    /// frame on the wire. Shared writers go through [`spawn_writer`].
    pub async fn write_frame(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.inner.write_all(data).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Largest payload this writer accepts
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Shut down the write half
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

enum WriteCommand {
    Frame {
        data: Vec<u8>,
        done: oneshot::Sender<Result<(), TransportError>>,
    },
    Close,
}

/// Cloneable sender for the writer task
///
/// Shared by the dispatch loop, background tasks and push calls.
#[derive(Clone, Debug)]
pub struct WriterHandle {
    tx: mpsc::Sender<WriteCommand>,
    max_frame_size: usize,
}

impl WriterHandle {
    /// Encode `msg` and wait until its frame has been written
    ///
    /// Encoding happens here, so `FrameTooLarge` and `Serialization` are
    /// reported before anything is queued. Cancel safe: dropping the future
    /// never truncates a frame that was already queued.
    pub async fn send<T: Serialize>(&self, msg: &T) -> Result<(), TransportError> {
        let data = encode(msg, self.max_frame_size)?;
        let (done, written) = oneshot::channel();
        self.tx
            .send(WriteCommand::Frame { data, done })
            .await
            .map_err(|_| TransportError::ConnectionClosed)?;
        written.await.map_err(|_| TransportError::ConnectionClosed)?
    }

    /// Ask the writer task to shut down the write half after queued frames
    ///
    /// Does not wait. Skipped when the queue is full.
    pub fn close(&self) {
        if self.tx.try_send(WriteCommand::Close).is_err() {
            debug!("Writer queue full or gone, close request skipped");
        }
    }
}

/// Move `writer` into its own task
///
/// The task ends after a [`WriterHandle::close`] or when every handle is
/// dropped. After the first failed write it stops touching the stream and
/// answers `ConnectionClosed` to every later frame.
pub fn spawn_writer(writer: FrameWriter) -> (WriterHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
    let handle = WriterHandle {
        tx,
        max_frame_size: writer.max_frame_size(),
    };
    (handle, tokio::spawn(write_loop(writer, rx)))
}

async fn write_loop(mut writer: FrameWriter, mut rx: mpsc::Receiver<WriteCommand>) {
    let mut failed = false;

    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Frame { data, done } => {
                let result = if failed {
                    Err(TransportError::ConnectionClosed)
                } else {
                    writer.write_frame(&data).await
                };
                if let Err(e) = &result {
                    if !failed {
                        debug!(error = %e, "Frame write failed, writer disabled");
                    }
                    failed = true;
                }
                // The sender may have stopped waiting; the frame is complete either way
                let _ = done.send(result);
            }
            WriteCommand::Close => {
                if !failed {
                    if let Err(e) = writer.shutdown().await {
                        debug!(error = %e, "Error closing write half");
                    }
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_write_then_read_frames() {
        let (client, server) = tokio::io::duplex(64);
        let (read_half, _) = tokio::io::split(server);
        let (_, write_half) = tokio::io::split(client);

        let mut writer = FrameWriter::new(write_half, 1024);
        let mut reader = FrameReader::new(read_half, 1024);

        let writes = tokio::spawn(async move {
            for i in 0..3 {
                writer
                    .write_message(&json!({"method": "ping", "params": {"n": i}}))
                    .await
                    .unwrap();
            }
            writer.shutdown().await.unwrap();
        });

        for i in 0..3 {
            let payload = reader.next_frame().await.unwrap().unwrap();
            let value: Value = serde_json::from_slice(&payload).unwrap();
            assert_eq!(value["params"]["n"], i);
        }
        assert!(reader.next_frame().await.unwrap().is_none());
        writes.await.unwrap();
    }

    #[tokio::test]
    async fn test_frames_split_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0, 0])
            .read(&[0, 2, b'{'])
            .read(&[b'}', 0, 0, 0, 4, b'[', b'1'])
            .read(&[b']', b' '])
            .build();
        let mut reader = FrameReader::new(mock, 1024);

        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"{}");
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), b"[1] ");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writer_emits_one_complete_frame() {
        let payload = br#"{"method":"x"}"#;
        let mut expected = (payload.len() as u32).to_be_bytes().to_vec();
        expected.extend_from_slice(payload);

        let mock = tokio_test::io::Builder::new().write(&expected).build();
        let mut writer = FrameWriter::new(mock, 1024);
        writer.write_message(&json!({"method": "x"})).await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_inside_frame_is_truncated() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server, 1024);

        // Length says 100 bytes, but only provide 10
        client.write_all(&100u32.to_be_bytes()).await.unwrap();
        client.write_all(&[b'x'; 10]).await.unwrap();
        drop(client);

        let result = reader.next_frame().await;
        assert!(matches!(
            result,
            Err(TransportError::Truncated { buffered: 14 })
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_header_is_truncated() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server, 1024);

        client.write_all(&[0, 0]).await.unwrap();
        drop(client);

        assert!(matches!(
            reader.next_frame().await,
            Err(TransportError::Truncated { buffered: 2 })
        ));
    }

    #[tokio::test]
    async fn test_oversized_outbound_writes_nothing() {
        let (client, mut server) = tokio::io::duplex(4096);
        let mut writer = FrameWriter::new(client, 16);

        let result = writer.write_message(&json!({"big": "x".repeat(64)})).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));

        writer.write_message(&json!({})).await.unwrap();
        writer.shutdown().await.unwrap();

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, [0, 0, 0, 2, b'{', b'}']);
    }

    #[tokio::test]
    async fn test_abandoned_send_still_writes_whole_frame() {
        // Much smaller than the frame, so the write blocks until the peer reads
        let (client, server) = tokio::io::duplex(512);
        let (read_half, _) = tokio::io::split(server);
        let (_, write_half) = tokio::io::split(client);
        let (handle, _task) = spawn_writer(FrameWriter::new(write_half, 1 << 20));
        let mut reader = FrameReader::new(read_half, 1 << 20);

        let big = json!({"method": "big", "params": {"blob": "x".repeat(4096)}});
        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(20), handle.send(&big)).await;
        assert!(abandoned.is_err());

        let small = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.send(&json!({"method": "small"})).await })
        };

        let first: Value = serde_json::from_slice(&reader.next_frame().await.unwrap().unwrap())
            .unwrap();
        assert_eq!(first["method"], "big");
        assert_eq!(first["params"]["blob"].as_str().unwrap().len(), 4096);

        let second: Value = serde_json::from_slice(&reader.next_frame().await.unwrap().unwrap())
            .unwrap();
        assert_eq!(second["method"], "small");
        small.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_flushes_queued_frames_then_ends() {
        let (client, server) = tokio::io::duplex(4096);
        let (read_half, _) = tokio::io::split(server);
        let (_, write_half) = tokio::io::split(client);
        let (handle, task) = spawn_writer(FrameWriter::new(write_half, 1024));
        let mut reader = FrameReader::new(read_half, 1024);

        handle.send(&json!({"n": 1})).await.unwrap();
        handle.close();
        task.await.unwrap();

        assert_eq!(reader.next_frame().await.unwrap().unwrap(), br#"{"n":1}"#);
        assert!(reader.next_frame().await.unwrap().is_none());
        assert!(matches!(
            handle.send(&json!({"n": 2})).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_handle_rejects_oversized_before_queueing() {
        let (client, _server) = tokio::io::duplex(4096);
        let (handle, _task) = spawn_writer(FrameWriter::new(client, 16));

        let result = handle.send(&json!({"big": "x".repeat(64)})).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));
        handle.send(&json!({})).await.unwrap();
    }
}
