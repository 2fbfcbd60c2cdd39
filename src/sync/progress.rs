//! Progress reporting hook.
//!
//! The engine reports progress as a side effect; nothing it does depends on
//! the sink. Sinks must be cheap to call at any frequency.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// Running count within a unit of work (one directory for pulls).
    Count {
        /// Items handled so far.
        completed: usize,
        /// Items in the unit.
        total: usize,
        /// Human-readable context, e.g. the remote directory.
        message: String,
    },
    /// Overall percentage.
    Percent {
        /// 0..=100.
        percent: u8,
        /// Human-readable context.
        message: String,
    },
}

/// Fire-and-forget receiver of [`ProgressUpdate`]s.
pub trait ProgressSink: Send + Sync {
    /// Receives one update.
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update);
    }
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

/// Sink that keeps every update in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordedProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordedProgress {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the updates received so far.
    #[must_use]
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordedProgress {
    fn report(&self, update: ProgressUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
    }
}

/// Percentage of `completed` out of `total`, clamped to 0..=100.
#[must_use]
pub fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = completed.min(total).saturating_mul(100) / total;
    u8::try_from(pct).unwrap_or(100)
}
