//! Cooperative cancellation for sync sessions.
//!
//! The engine checks its token between work units (before every listing entry
//! and before descending into a subdirectory). An individual transfer that is
//! already running is allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::debug;

/// Shared cancellation flag.
///
/// Clones observe and trigger the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing interrupt flag, e.g. one set by a Ctrl+C handler.
    #[must_use]
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { cancelled: flag }
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns true if both tokens share the same flag.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Serializes launch pulls: at most one is active at a time.
///
/// Starting a pull cancels whichever pull is still in flight. Cancellation is
/// cooperative, so the new pull must also hold the [`PullCoordinator::exclusive`]
/// guard, which the superseded pull releases only once its session has closed.
#[derive(Debug, Default)]
pub struct PullCoordinator {
    active: Mutex<Option<CancellationToken>>,
    running: AsyncMutex<()>,
}

impl PullCoordinator {
    /// Creates a coordinator with no active pull.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any in-flight pull and registers a fresh token for a new one.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.replace(token.clone()) {
            debug!("superseding in-flight pull");
            previous.cancel();
        }
        token
    }

    /// Waits until no other pull session is running and returns a guard that
    /// keeps it that way until dropped.
    pub async fn exclusive(&self) -> AsyncMutexGuard<'_, ()> {
        self.running.lock().await
    }

    /// Cancels the active pull, if any. Returns true if one was cancelled.
    pub fn cancel_active(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Clears the slot if it still belongs to `token`.
    ///
    /// A pull that was superseded must not clear its successor's token.
    pub fn finish(&self, token: &CancellationToken) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|current| current.same_as(token)) {
            *active = None;
        }
    }

    /// Returns true while a pull is registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
