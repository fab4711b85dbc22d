//! Shutdown signalling
//!
//! A [`ShutdownToken`] is threaded through the receive loop and every
//! background task. SIGINT and SIGTERM cancel it; so does the receive loop
//! ending on its own.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Cloneable, awaitable cancellation flag
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    /// Create a token that is not yet cancelled
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown; every clone observes it
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until shutdown is requested
    ///
    /// Resolves immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as self, so wait_for cannot fail
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Cancel `token` on SIGINT or SIGTERM
///
/// Handlers are installed before this returns so that a signal arriving
/// right after startup is not lost. The listener exits quietly if the token
/// is cancelled for another reason.
pub fn spawn_signal_listener(token: ShutdownToken) -> std::io::Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => {
                info!("Received SIGINT, shutting down");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            () = token.cancelled() => return,
        }
        token.cancel();
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_all_clones() {
        let token = ShutdownToken::new();
        assert!(!token.is_cancelled());

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let t = token.clone();
                tokio::spawn(async move { t.cancelled().await })
            })
            .collect();

        token.cancel();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_already_cancelled() {
        let token = ShutdownToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_signal_listener_exits_on_token() {
        let token = ShutdownToken::new();
        let handle = spawn_signal_listener(token.clone()).unwrap();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    async fn assert_signal_cancels(signum: libc::c_int) {
        let token = ShutdownToken::new();
        let handle = spawn_signal_listener(token.clone()).unwrap();

        // Handlers are installed, so the signal no longer terminates the process
        let rc = unsafe { libc::raise(signum) };
        assert_eq!(rc, 0);

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("signal did not cancel the token");
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_sigterm_cancels_token() {
        assert_signal_cancels(libc::SIGTERM).await;
    }

    #[tokio::test]
    async fn test_sigint_cancels_token() {
        assert_signal_cancels(libc::SIGINT).await;
    }
}
