//! Handle given to handlers and background tasks

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::correlation::PendingRequests;
use crate::error::{PluginError, Result};
use crate::protocol::Envelope;
use crate::runtime::shutdown::ShutdownToken;
use crate::transport::{TransportError, WriterHandle};

/// Cheap, cloneable access to the connection from plugin code
///
/// Every clone queues frames to the same writer task, so frames from
/// handlers, background tasks and the dispatch loop never interleave, and a
/// caller dropped mid-send never leaves half a frame behind.
#[derive(Clone)]
pub struct PluginContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    plugin_id: String,
    writer: WriterHandle,
    pending: PendingRequests,
    shutdown: ShutdownToken,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.inner.plugin_id)
            .field("pending", &self.inner.pending.len())
            .field("shutting_down", &self.inner.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PluginContext {
    pub(crate) fn new(
        plugin_id: impl Into<String>,
        writer: WriterHandle,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                plugin_id: plugin_id.into(),
                writer,
                pending: PendingRequests::new(),
                shutdown,
            }),
        }
    }

    /// Id from the manifest this plugin registered with
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.inner.plugin_id
    }

    /// Token cancelled when the plugin starts shutting down
    #[must_use]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.inner.shutdown.clone()
    }

    /// Whether shutdown has begun
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub(crate) fn pending(&self) -> &PendingRequests {
        &self.inner.pending
    }

    pub(crate) fn writer(&self) -> &WriterHandle {
        &self.inner.writer
    }

    /// Queue one envelope and wait until it is on the wire
    pub(crate) async fn send(&self, envelope: &Envelope) -> std::result::Result<(), TransportError> {
        self.inner.writer.send(envelope).await
    }

    /// Send a Notification with an arbitrary method name
    ///
    /// Never creates a pending request; returns once the frame is written.
    pub async fn notify<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
        let params = serde_json::to_value(params)?;
        self.send(&Envelope::notification(method, params)).await?;
        debug!(method = %method, "Sent notification");
        Ok(())
    }

    /// Send a Request to the host and wait for its Response
    ///
    /// There is no timeout; the call resolves when the host answers or the
    /// connection closes (`ConnectionClosed`). Dropping the future forgets
    /// the request, and a late Response for it is discarded.
    pub async fn request<P: Serialize>(&self, method: &str, params: P) -> Result<Value> {
        let params = serde_json::to_value(params)?;
        let (id, waiter) = self.inner.pending.register()?;
        let _guard = self.inner.pending.guard(id);

        self.send(&Envelope::request(id, method, params)).await?;
        debug!(method = %method, id = id, "Sent request");

        match waiter.await {
            Ok(outcome) => outcome,
            // Sender dropped without resolving: the table went away with the connection
            Err(_) => Err(PluginError::Transport(TransportError::ConnectionClosed)),
        }
    }

    /// Like [`request`](Self::request), deserializing the result into `T`
    pub async fn request_typed<T, P>(&self, method: &str, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let value = self.request(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::transport::{spawn_writer, FrameReader, FrameWriter};
    use tokio::io::{DuplexStream, ReadHalf};

    /// Context wired to an in-memory peer; the returned reader sees every frame written
    pub(crate) fn context_pair() -> (PluginContext, FrameReader<ReadHalf<DuplexStream>>) {
        context_pair_with_buffer(1 << 16)
    }

    /// Like [`context_pair`] with `buffer` bytes of in-flight capacity
    pub(crate) fn context_pair_with_buffer(
        buffer: usize,
    ) -> (PluginContext, FrameReader<ReadHalf<DuplexStream>>) {
        let (ours, theirs) = tokio::io::duplex(buffer);
        let (_, write_half) = tokio::io::split(ours);
        let (read_half, _) = tokio::io::split(theirs);

        let (writer, _task) = spawn_writer(FrameWriter::new(write_half, 1 << 20));
        let ctx = PluginContext::new("test", writer, ShutdownToken::new());
        (ctx, FrameReader::new(read_half, 1 << 20))
    }
}
