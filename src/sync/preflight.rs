//! Launch pre-flight: bring the local install up to date before starting.
//!
//! Failures are logged and reported as [`LaunchReadiness::NotReady`]; the
//! caller decides what to show the user.

use tracing::{error, info, instrument};

use super::{ProgressSink, PullCoordinator, PullOptions, PullSummary, SyncSession};
use crate::transport::RemoteTransport;

/// Result of a launch pre-flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchReadiness {
    /// The pull completed; the install matches the remote tree.
    Ready(PullSummary),
    /// The pull was cancelled or superseded; the install may be incomplete.
    Cancelled(PullSummary),
    /// The pull failed.
    NotReady {
        /// Rendered error, for display.
        reason: String,
    },
}

impl LaunchReadiness {
    /// Returns true for [`LaunchReadiness::Ready`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Runs the pre-launch pull through `coordinator`.
///
/// Any pull still in flight is cancelled first, and this pull waits for it to
/// close its session before opening its own, so at most one launch pull
/// touches the install at a time.
#[instrument(skip_all, fields(remote_root = %options.remote_root))]
pub async fn prepare_launch<T>(
    coordinator: &PullCoordinator,
    transport: T,
    options: &PullOptions,
    progress: &dyn ProgressSink,
) -> LaunchReadiness
where
    T: RemoteTransport,
{
    let token = coordinator.begin();
    let running = coordinator.exclusive().await;

    let result = if token.is_cancelled() {
        // Superseded while waiting for the previous pull to stop.
        Ok(PullSummary {
            cancelled: true,
            ..PullSummary::default()
        })
    } else {
        match SyncSession::open(transport, token.clone()).await {
            Ok(session) => session.pull(options, progress).await,
            Err(e) => Err(e),
        }
    };
    coordinator.finish(&token);
    drop(running);

    match result {
        Ok(summary) if summary.cancelled => {
            info!("launch pull cancelled");
            LaunchReadiness::Cancelled(summary)
        }
        Ok(summary) => LaunchReadiness::Ready(summary),
        Err(e) => {
            error!(error = %e, "launch pull failed");
            LaunchReadiness::NotReady {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::sync::NoProgress;
    use crate::transport::{LocalTransport, RemoteEntry, TransferError};

    /// Counts sessions that are connected at the same time.
    struct SessionCounter {
        inner: LocalTransport,
        live: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl SessionCounter {
        fn new(root: &Path, live: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Self {
            Self {
                inner: LocalTransport::new(root),
                live: Arc::clone(live),
                peak: Arc::clone(peak),
            }
        }
    }

    #[async_trait]
    impl RemoteTransport for SessionCounter {
        async fn connect(&mut self) -> Result<(), TransferError> {
            self.inner.connect().await?;
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransferError> {
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.inner.close().await
        }

        async fn change_directory(&mut self, path: &str) -> Result<bool, TransferError> {
            self.inner.change_directory(path).await
        }

        async fn ensure_directory(&mut self, path: &str) -> Result<(), TransferError> {
            self.inner.ensure_directory(path).await
        }

        async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
            self.inner.list(path).await
        }

        async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError> {
            self.inner.upload(local, remote).await
        }

        async fn download(&mut self, remote: &str, local: &Path) -> Result<(), TransferError> {
            tokio::task::yield_now().await;
            self.inner.download(remote, local).await
        }

        async fn remove(&mut self, remote: &str) -> Result<(), TransferError> {
            self.inner.remove(remote).await
        }

        async fn remove_directory(&mut self, remote: &str) -> Result<(), TransferError> {
            self.inner.remove_directory(remote).await
        }

        async fn last_modified(&mut self, remote: &str) -> Option<SystemTime> {
            self.inner.last_modified(remote).await
        }
    }

    #[tokio::test]
    async fn test_prepare_launch_ready() {
        let remote = TempDir::new().unwrap();
        std::fs::create_dir(remote.path().join("mc")).unwrap();
        std::fs::write(remote.path().join("mc/a.jar"), b"a").unwrap();
        let local = TempDir::new().unwrap();
        let coordinator = PullCoordinator::new();

        let readiness = prepare_launch(
            &coordinator,
            LocalTransport::new(remote.path()),
            &PullOptions::new("/mc", local.path()),
            &NoProgress,
        )
        .await;

        match readiness {
            LaunchReadiness::Ready(summary) => {
                assert_eq!(summary.downloaded, 1);
                assert!(summary.first_install);
            }
            other => panic!("expected ready, got {other:?}"),
        }
        assert!(!coordinator.is_active());
    }

    #[tokio::test]
    async fn test_prepare_launch_connect_failure_is_not_ready() {
        let dir = TempDir::new().unwrap();
        let coordinator = PullCoordinator::new();

        let readiness = prepare_launch(
            &coordinator,
            LocalTransport::new(dir.path().join("missing")),
            &PullOptions::new("/mc", dir.path().join("game")),
            &NoProgress,
        )
        .await;

        assert!(matches!(readiness, LaunchReadiness::NotReady { .. }));
        assert!(!readiness.is_ready());
        assert!(!coordinator.is_active());
    }

    #[tokio::test]
    async fn test_overlapping_launches_run_one_session_at_a_time() {
        let remote = TempDir::new().unwrap();
        for dir in ["a", "b", "c"] {
            std::fs::create_dir_all(remote.path().join("mc").join(dir)).unwrap();
            for name in ["1.bin", "2.bin"] {
                std::fs::write(remote.path().join("mc").join(dir).join(name), name).unwrap();
            }
        }
        let local = TempDir::new().unwrap();
        let options = PullOptions::new("/mc", local.path());
        let coordinator = PullCoordinator::new();
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (first, second) = tokio::join!(
            prepare_launch(
                &coordinator,
                SessionCounter::new(remote.path(), &live, &peak),
                &options,
                &NoProgress,
            ),
            async {
                tokio::task::yield_now().await;
                prepare_launch(
                    &coordinator,
                    SessionCounter::new(remote.path(), &live, &peak),
                    &options,
                    &NoProgress,
                )
                .await
            },
        );

        assert_eq!(peak.load(Ordering::SeqCst), 1, "pull sessions overlapped");
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(!matches!(first, LaunchReadiness::NotReady { .. }), "got {first:?}");
        assert!(second.is_ready(), "got {second:?}");
        assert!(!coordinator.is_active());
        for dir in ["a", "b", "c"] {
            for name in ["1.bin", "2.bin"] {
                let body = std::fs::read(local.path().join(dir).join(name)).unwrap();
                assert_eq!(body, name.as_bytes());
            }
        }
    }
}
