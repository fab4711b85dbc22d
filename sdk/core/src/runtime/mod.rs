//! Plugin runtime
//!
//! ```text
//!              ┌──────────────┐  Response   ┌─────────────────┐
//!  socket ───▶ │ reader task  │ ──────────▶ │ PendingRequests │
//!              └──────┬───────┘             └─────────────────┘
//!                     │ Request / Notification (arrival order)
//!                     ▼
//!              ┌──────────────┐   Response  ┌──────────────┐
//!              │ dispatch loop│ ──────────▶ │ writer task  │ ◀── tasks, push API
//!              └──────────────┘             └──────┬───────┘
//!                                                  ▼ socket
//! ```
//!
//! The reader routes Responses straight to the correlation table, so a
//! handler may await an outbound request without stalling the connection.
//! The dispatch loop handles one inbound message at a time and writes its
//! Response before taking the next. Only the writer task touches the write
//! half; everyone else queues whole frames to it.

pub mod register;
pub mod shutdown;
pub mod tasks;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PluginConfig;
use crate::context::PluginContext;
use crate::dispatch::{
    ActionRequest, FormSubmitted, HandlerTable, InitialRequest, SearchRequest, SliderChanged,
    SwitchToggled,
};
use crate::error::{PluginError, Result};
use crate::manifest::Manifest;
use crate::protocol::methods::{
    ACTION, FORM_SUBMITTED, INITIAL, INTERNAL_ERROR, SEARCH, SLIDER_CHANGED, SWITCH_TOGGLED,
};
use crate::protocol::{Envelope, Message, RequestId, RpcError};
use crate::transport::{spawn_writer, unix_socket, FrameReader, FrameWriter, TransportError};

use shutdown::ShutdownToken;
use tasks::{BackgroundTask, TaskSupervisor};

/// Inbound call queued for the dispatch loop
#[derive(Debug)]
struct InboundCall {
    /// `None` for Notifications
    id: Option<RequestId>,
    method: String,
    params: Value,
}

/// Collects the manifest, handlers and tasks for a [`Plugin`]
#[derive(Debug)]
pub struct PluginBuilder {
    manifest: Manifest,
    config: PluginConfig,
    handlers: HandlerTable,
    tasks: Vec<BackgroundTask>,
}

impl PluginBuilder {
    /// Use `config` instead of the defaults
    #[must_use]
    pub fn config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an async handler for any method name
    #[must_use]
    pub fn on<T, R, F, Fut>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.handlers.on(method, handler);
        self
    }

    /// Register a synchronous handler for any method name
    #[must_use]
    pub fn on_sync<T, R, F>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.handlers.on_sync(method, handler);
        self
    }

    /// Handle `initial`
    #[must_use]
    pub fn on_initial<R, F, Fut>(self, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, InitialRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.on(INITIAL, handler)
    }

    /// Handle `search`
    #[must_use]
    pub fn on_search<R, F, Fut>(self, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, SearchRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.on(SEARCH, handler)
    }

    /// Handle `action`
    #[must_use]
    pub fn on_action<R, F, Fut>(self, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, ActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.on(ACTION, handler)
    }

    /// Handle `form_submitted`
    #[must_use]
    pub fn on_form_submitted<R, F, Fut>(self, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, FormSubmitted) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.on(FORM_SUBMITTED, handler)
    }

    /// Handle `slider_changed`
    #[must_use]
    pub fn on_slider_changed<R, F, Fut>(self, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, SliderChanged) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.on(SLIDER_CHANGED, handler)
    }

    /// Handle `switch_toggled`
    #[must_use]
    pub fn on_switch_toggled<R, F, Fut>(self, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, SwitchToggled) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.on(SWITCH_TOGGLED, handler)
    }

    /// Add a background task, started once registration succeeds
    #[must_use]
    pub fn task<F, Fut>(mut self, name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(PluginContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tasks.push(BackgroundTask::new(name, task));
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> Plugin {
        Plugin {
            manifest: self.manifest,
            config: self.config,
            handlers: Arc::new(self.handlers),
            tasks: self.tasks,
        }
    }
}

/// A configured plugin, ready to connect
#[derive(Debug)]
pub struct Plugin {
    manifest: Manifest,
    config: PluginConfig,
    handlers: Arc<HandlerTable>,
    tasks: Vec<BackgroundTask>,
}

impl Plugin {
    /// Start building a plugin with the given identity
    #[must_use]
    pub fn builder(manifest: Manifest) -> PluginBuilder {
        PluginBuilder {
            manifest,
            config: PluginConfig::default(),
            handlers: HandlerTable::new(),
            tasks: Vec::new(),
        }
    }

    /// Identity this plugin registers with
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Connect to the host and serve until EOF, a fatal error, or SIGINT/SIGTERM
    ///
    /// Returns `Ok(())` on a clean end (host EOF or signal). Connection and
    /// registration failures are returned before any task starts.
    pub async fn run(self) -> Result<()> {
        let shutdown = ShutdownToken::new();
        let signals =
            shutdown::spawn_signal_listener(shutdown.clone()).map_err(PluginError::Signal)?;

        let result = async {
            let (stream, path) = unix_socket::connect_discovered(&self.config.transport).await?;
            info!(socket = %path.display(), plugin_id = %self.manifest.id, "Connected to host");

            let max_frame_size = self.config.transport.max_frame_size;
            let (reader, writer) = unix_socket::split(stream, max_frame_size);
            self.serve_split(reader, writer, shutdown.clone()).await
        }
        .await;

        signals.abort();
        result
    }

    /// Serve over an already-connected stream
    ///
    /// Cancelling `shutdown` has the same effect as a signal.
    pub async fn serve<S>(self, stream: S, shutdown: ShutdownToken) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let max_frame_size = self.config.transport.max_frame_size;
        let (read_half, write_half) = tokio::io::split(stream);
        self.serve_split(
            FrameReader::new(read_half, max_frame_size),
            FrameWriter::new(write_half, max_frame_size),
            shutdown,
        )
        .await
    }

    async fn serve_split<R>(
        self,
        mut reader: FrameReader<R>,
        writer: FrameWriter,
        shutdown: ShutdownToken,
    ) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let Self {
            manifest,
            config,
            handlers,
            tasks,
        } = self;
        let runtime = config.runtime;

        let (writer, writer_task) = spawn_writer(writer);
        let ctx = PluginContext::new(manifest.id.clone(), writer, shutdown.clone());

        if let Err(e) =
            register::register(&mut reader, &ctx, &manifest, runtime.register_timeout()).await
        {
            close_writer(&ctx, writer_task, runtime.shutdown_grace()).await;
            return Err(e);
        }

        let mut supervisor = TaskSupervisor::new();
        for task in tasks {
            supervisor.spawn(task, ctx.clone());
        }
        info!(
            handlers = handlers.len(),
            tasks = supervisor.len(),
            "Plugin runtime started"
        );

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(
            reader,
            ctx.clone(),
            queue_tx,
            runtime.max_protocol_errors,
        ));

        let dispatch_result = dispatch_loop(queue_rx, &handlers, &ctx).await;

        // Everything below runs exactly once, whatever ended the loop
        shutdown.cancel();
        let read_result = match reader_task.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Reader task ended abnormally");
                Err(TransportError::ConnectionClosed)
            }
        };

        let report = supervisor.shutdown(runtime.shutdown_grace()).await;
        let rejected = ctx.pending().reject_all();
        close_writer(&ctx, writer_task, runtime.shutdown_grace()).await;
        info!(
            tasks_drained = report.drained,
            tasks_aborted = report.aborted,
            requests_rejected = rejected,
            "Plugin runtime stopped"
        );

        read_result?;
        dispatch_result
    }
}

/// Decode frames until EOF, shutdown, or a fatal transport error
///
/// Responses resolve pending requests immediately; calls are queued in
/// arrival order. Dropping `queue` on exit ends the dispatch loop once it
/// has drained.
async fn read_loop<R>(
    mut reader: FrameReader<R>,
    ctx: PluginContext,
    queue: mpsc::UnboundedSender<InboundCall>,
    max_protocol_errors: u32,
) -> std::result::Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    let shutdown = ctx.shutdown_token();
    let mut consecutive_errors = 0u32;

    let result = loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => break Ok(()),
            frame = reader.next_frame() => frame,
        };

        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!("Host closed the connection");
                break Ok(());
            }
            Err(TransportError::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
                ) =>
            {
                info!(error = %e, "Host reset the connection");
                break Ok(());
            }
            Err(e) => {
                error!(error = %e, "Transport error, closing connection");
                break Err(e);
            }
        };

        match Message::parse(&payload) {
            Ok(message) => {
                consecutive_errors = 0;
                match message {
                    Message::Response { id, outcome } => {
                        ctx.pending().resolve(id, outcome);
                    }
                    Message::Request { id, method, params } => {
                        debug!(method = %method, id = id, "Received request");
                        if queue.send(InboundCall { id: Some(id), method, params }).is_err() {
                            break Ok(());
                        }
                    }
                    Message::Notification { method, params } => {
                        debug!(method = %method, "Received notification");
                        if queue.send(InboundCall { id: None, method, params }).is_err() {
                            break Ok(());
                        }
                    }
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(
                    error = %e,
                    consecutive = consecutive_errors,
                    "Discarding malformed frame"
                );
                if consecutive_errors >= max_protocol_errors {
                    break Err(TransportError::ProtocolViolation(format!(
                        "{consecutive_errors} consecutive malformed frames, last: {e}"
                    )));
                }
            }
        }
    };

    // Nobody can answer outstanding requests any more
    ctx.pending().reject_all();
    result
}

/// Handle queued calls one at a time, in arrival order
async fn dispatch_loop(
    mut queue: mpsc::UnboundedReceiver<InboundCall>,
    handlers: &HandlerTable,
    ctx: &PluginContext,
) -> Result<()> {
    let shutdown = ctx.shutdown_token();

    loop {
        let call = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(()),
            call = queue.recv() => match call {
                Some(call) => call,
                None => return Ok(()),
            },
        };

        let InboundCall { id, method, params } = call;
        let outcome = handlers.dispatch(ctx.clone(), &method, params).await;

        let Some(id) = id else {
            if let Err(e) = outcome {
                warn!(method = %method, error = %e, "Notification handler failed");
            }
            continue;
        };

        if let Err(e) = &outcome {
            warn!(method = %method, id = id, error = %e, "Request handler failed");
        }
        if let Err(e) = respond(ctx, id, outcome).await {
            if e.is_disconnect() {
                // Host went away mid-call; same as EOF
                debug!(method = %method, id = id, error = %e, "Host gone before response was written");
                return Ok(());
            }
            error!(method = %method, id = id, error = %e, "Failed to write response");
            return Err(e.into());
        }
    }
}

/// Write the Response for `id`
///
/// A result too large (or unserializable) for one frame is replaced by an
/// error Response so the host is never left waiting.
async fn respond(
    ctx: &PluginContext,
    id: RequestId,
    outcome: std::result::Result<Value, RpcError>,
) -> std::result::Result<(), TransportError> {
    let envelope = match outcome {
        Ok(result) => Envelope::response_ok(id, result),
        Err(error) => Envelope::response_err(id, error),
    };

    match ctx.send(&envelope).await {
        Err(e @ (TransportError::FrameTooLarge { .. } | TransportError::Serialization(_))) => {
            warn!(id = id, error = %e, "Response could not be framed, answering with an error");
            let fallback = Envelope::response_err(id, RpcError::new(INTERNAL_ERROR, e.to_string()));
            ctx.send(&fallback).await
        }
        other => other,
    }
}

/// Let the writer task flush queued frames and close the write half
///
/// Bounded by `grace`: a host that stopped reading cannot hang shutdown.
async fn close_writer(ctx: &PluginContext, mut writer_task: JoinHandle<()>, grace: Duration) {
    ctx.writer().close();
    if tokio::time::timeout(grace, &mut writer_task).await.is_err() {
        debug!("Writer still blocked at shutdown, aborting it");
        writer_task.abort();
    }
}
