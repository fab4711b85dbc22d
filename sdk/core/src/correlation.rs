//! Request/Response correlation
//!
//! Outbound requests are numbered from 1 upwards. Each id maps to a oneshot
//! waiter that is resolved exactly once: by the matching Response, or by
//! [`PendingRequests::reject_all`] when the connection goes away.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::PluginError;
use crate::protocol::{RequestId, RpcError};
use crate::transport::TransportError;

/// Outcome delivered to the code awaiting a request
pub type RequestOutcome = Result<Value, PluginError>;

/// Receiving end handed to the caller of an outbound request
pub type Waiter = oneshot::Receiver<RequestOutcome>;

/// Table of in-flight outbound requests
#[derive(Debug)]
pub struct PendingRequests {
    next_id: AtomicU64,
    waiters: DashMap<RequestId, oneshot::Sender<RequestOutcome>>,
    closed: AtomicBool,
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRequests {
    /// Create an empty table; the first id handed out is 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            waiters: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Allocate an id and store a waiter for it
    ///
    /// Fails with `ConnectionClosed` once [`reject_all`](Self::reject_all) has run.
    pub fn register(&self) -> Result<(RequestId, Waiter), PluginError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed.into());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);

        // reject_all may have drained the table between the check and the insert
        if self.closed.load(Ordering::SeqCst) {
            self.waiters.remove(&id);
            return Err(TransportError::ConnectionClosed.into());
        }

        Ok((id, rx))
    }

    /// Resolve the waiter for `id`
    ///
    /// Returns false when no request with that id is pending; the Response is
    /// then dropped.
    pub fn resolve(&self, id: RequestId, outcome: Result<Value, RpcError>) -> bool {
        let Some((_, tx)) = self.waiters.remove(&id) else {
            tracing::warn!(id = id, "Response for unknown request id, dropping");
            return false;
        };

        if tx.send(outcome.map_err(PluginError::Rpc)).is_err() {
            tracing::debug!(id = id, "Requester stopped waiting before the response arrived");
        }
        true
    }

    /// Forget a request nobody is waiting for any more
    pub fn cancel(&self, id: RequestId) {
        self.waiters.remove(&id);
    }

    /// Cancel `id` when the returned guard is dropped
    ///
    /// A no-op for ids already resolved or rejected.
    pub(crate) fn guard(&self, id: RequestId) -> PendingGuard<'_> {
        PendingGuard { pending: self, id }
    }

    /// Reject every outstanding request with `ConnectionClosed`
    ///
    /// Also closes the table so later registrations fail immediately.
    /// Returns how many requests were rejected.
    pub fn reject_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);

        let ids: Vec<RequestId> = self.waiters.iter().map(|entry| *entry.key()).collect();
        let mut rejected = 0;
        for id in ids {
            if let Some((_, tx)) = self.waiters.remove(&id) {
                let _ = tx.send(Err(TransportError::ConnectionClosed.into()));
                rejected += 1;
            }
        }

        if rejected > 0 {
            tracing::debug!(count = rejected, "Rejected pending requests on close");
        }
        rejected
    }

    /// Number of requests awaiting a Response
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether no request is awaiting a Response
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// Removes its request from the table on drop
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.id);
    }
}
