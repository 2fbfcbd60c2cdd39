//! A sync session: one transport connection, one operation, one close.

use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use super::{
    CancellationToken, ProgressSink, PullOptions, PullSummary, PushFile, PushOptions, PushSummary,
    RemoveSummary, SyncError, pull, push, remove,
};
use crate::transport::RemoteTransport;

/// Exclusive owner of a connected transport for the length of one operation.
///
/// Every operation consumes the session and closes the transport exactly once,
/// whether or not the operation succeeded.
#[derive(Debug)]
pub struct SyncSession<T: RemoteTransport> {
    transport: T,
    token: CancellationToken,
}

impl<T: RemoteTransport> SyncSession<T> {
    /// Connects `transport` and wraps it in a session.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Connect`] if the connection cannot be established.
    /// The transport is closed on a best-effort basis first.
    #[instrument(skip_all)]
    pub async fn open(mut transport: T, token: CancellationToken) -> Result<Self, SyncError> {
        if let Err(e) = transport.connect().await {
            if let Err(close_error) = transport.close().await {
                debug!(error = %close_error, "close after failed connect");
            }
            return Err(SyncError::Connect(e));
        }
        Ok(Self { transport, token })
    }

    /// The token observed by this session.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Pulls the remote tree into the local install.
    ///
    /// # Errors
    ///
    /// See [`pull::run_pull`].
    pub async fn pull(
        mut self,
        options: &PullOptions,
        progress: &dyn ProgressSink,
    ) -> Result<PullSummary, SyncError> {
        let result = pull::run_pull(&mut self.transport, options, &self.token, progress).await;
        self.finish(result).await
    }

    /// Pushes a batch of files below `remote_root`.
    ///
    /// # Errors
    ///
    /// See [`push::run_push`]. Failing to create the scratch directory returns
    /// [`SyncError::Local`].
    pub async fn push(
        mut self,
        remote_root: &str,
        files: &[PushFile],
        options: PushOptions,
        progress: &dyn ProgressSink,
    ) -> Result<PushSummary, SyncError> {
        let result = match scratch_dir() {
            Ok(scratch) => {
                let result = push::run_push(
                    &mut self.transport,
                    remote_root,
                    files,
                    options,
                    &self.token,
                    progress,
                    scratch.path(),
                )
                .await;
                release_scratch(scratch);
                result
            }
            Err(e) => Err(e),
        };
        self.finish(result).await
    }

    /// Removes a remote file or directory and purges its manifest entries.
    ///
    /// # Errors
    ///
    /// See [`remove::run_remove`].
    pub async fn remove(
        mut self,
        remote_root: &str,
        relative_path: &str,
    ) -> Result<RemoveSummary, SyncError> {
        let result = match scratch_dir() {
            Ok(scratch) => {
                let result =
                    remove::run_remove(&mut self.transport, remote_root, relative_path, scratch.path())
                        .await;
                release_scratch(scratch);
                result
            }
            Err(e) => Err(e),
        };
        self.finish(result).await
    }

    /// Closes the transport. A close failure never replaces the operation's
    /// own outcome.
    async fn finish<R>(mut self, result: Result<R, SyncError>) -> Result<R, SyncError> {
        if let Err(e) = self.transport.close().await {
            match &result {
                Ok(_) => warn!(error = %e, "failed to close connection after success"),
                Err(_) => debug!(error = %e, "failed to close connection after error"),
            }
        }
        result
    }
}

fn scratch_dir() -> Result<TempDir, SyncError> {
    tempfile::Builder::new()
        .prefix("assetsync-")
        .tempdir()
        .map_err(|e| SyncError::local(std::env::temp_dir(), e))
}

fn release_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
    }
}
