//! Background task supervision
//!
//! Tasks are declared before the runtime starts and launched once
//! registration succeeds. A task ending, successfully or not, is logged and
//! otherwise ignored; only the receive loop decides when the plugin exits.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::PluginContext;

type TaskFactory = Box<dyn FnOnce(PluginContext) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A named unit of work run alongside the receive loop
pub struct BackgroundTask {
    name: String,
    factory: TaskFactory,
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BackgroundTask {
    /// Wrap an async closure; it is called once with the plugin context
    pub fn new<F, Fut>(name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(PluginContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(move |ctx| task(ctx).boxed()),
        }
    }

    /// Name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What happened to the tasks still running at shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Tasks that finished within the grace period
    pub drained: usize,
    /// Tasks aborted after the grace period
    pub aborted: usize,
}

/// Owns the running background tasks
#[derive(Default)]
pub struct TaskSupervisor {
    tasks: JoinSet<()>,
}

impl TaskSupervisor {
    /// Supervisor with no tasks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch `task` with its own clone of the context
    pub fn spawn(&mut self, task: BackgroundTask, ctx: PluginContext) {
        let BackgroundTask { name, factory } = task;
        debug!(task = %name, "Starting background task");

        let fut = AssertUnwindSafe(async move { factory(ctx).await }).catch_unwind();
        self.tasks.spawn(async move {
            match fut.await {
                Ok(Ok(())) => info!(task = %name, "Background task finished"),
                Ok(Err(e)) => warn!(task = %name, error = %format!("{e:#}"), "Background task failed"),
                Err(_) => error!(task = %name, "Background task panicked"),
            }
        });
    }

    /// Number of tasks not yet reaped
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are being supervised
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait up to `grace` for tasks to finish, then abort the rest
    ///
    /// Callers cancel the shutdown token first so cooperative tasks can exit.
    pub async fn shutdown(mut self, grace: Duration) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        let drain = async {
            while self.tasks.join_next().await.is_some() {
                report.drained += 1;
            }
        };
        if tokio::time::timeout(grace, drain).await.is_ok() {
            return report;
        }

        report.aborted = self.tasks.len();
        warn!(
            count = report.aborted,
            grace = ?grace,
            "Aborting background tasks still running after grace period"
        );
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        report
    }
}
