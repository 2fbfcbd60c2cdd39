//! Sync engine: pull, push and removal over a [`RemoteTransport`].
//!
//! A [`SyncSession`] owns one connected transport for one operation. Work is
//! strictly sequential inside a session; a [`CancellationToken`] is checked
//! between work units and never interrupts a transfer in flight.
//!
//! # Example
//!
//! ```no_run
//! use assetsync_core::sync::{CancellationToken, NoProgress, PullOptions, SyncSession};
//! use assetsync_core::transport::LocalTransport;
//!
//! # async fn example() -> Result<(), assetsync_core::sync::SyncError> {
//! let session = SyncSession::open(LocalTransport::new("/srv/share"), CancellationToken::new()).await?;
//! let summary = session
//!     .pull(&PullOptions::new("/mc", "/home/me/.game"), &NoProgress)
//!     .await?;
//! println!("downloaded {}", summary.downloaded);
//! # Ok(())
//! # }
//! ```
//!
//! [`RemoteTransport`]: crate::transport::RemoteTransport

mod cancel;
mod error;
mod preflight;
mod progress;
pub mod pull;
pub mod push;
pub mod remove;
mod session;

pub use cancel::{CancellationToken, PullCoordinator};
pub use error::SyncError;
pub use preflight::{LaunchReadiness, prepare_launch};
pub use progress::{NoProgress, ProgressSink, ProgressUpdate, RecordedProgress, percent_of};
pub use pull::{
    DEFAULT_MARKER_FILE, DownloadReason, PullDecision, PullOptions, PullSummary, SkipReason,
    decide_download, run_pull,
};
pub use push::{PushFile, PushOptions, PushSummary, group_by_directory, run_push};
pub use remove::{RemoveSummary, run_remove};
pub use session::SyncSession;
