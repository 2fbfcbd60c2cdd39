//! Directory-backed transport.
//!
//! Maps remote paths onto a root directory on the local filesystem. Useful for
//! mirroring from a mounted share and for exercising the sync engine without a
//! server.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::path::segments;
use super::{RemoteEntry, RemoteTransport, TransferError};

/// Transport that treats a local directory as the remote file store.
///
/// Both absolute and relative remote paths resolve under the root; `..`
/// segments are rejected.
#[derive(Debug)]
pub struct LocalTransport {
    root: PathBuf,
    connected: bool,
}

impl LocalTransport {
    /// Creates a transport rooted at `root`. Nothing is touched until `connect`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            connected: false,
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, remote: &str) -> Result<PathBuf, TransferError> {
        if !self.connected {
            return Err(TransferError::NotConnected);
        }
        let mut resolved = self.root.clone();
        for segment in segments(remote) {
            if segment == ".." {
                return Err(TransferError::invalid_path(remote));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

fn map_io(operation: &'static str, remote: &str, source: std::io::Error) -> TransferError {
    if source.kind() == ErrorKind::NotFound {
        TransferError::not_found(remote)
    } else {
        TransferError::protocol(operation, remote, source)
    }
}

#[async_trait]
impl RemoteTransport for LocalTransport {
    #[instrument(level = "debug", skip(self), fields(root = %self.root.display()))]
    async fn connect(&mut self) -> Result<(), TransferError> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|source| TransferError::connect(self.root.display().to_string(), source))?;
        if !metadata.is_dir() {
            return Err(TransferError::connect(
                self.root.display().to_string(),
                "root is not a directory",
            ));
        }
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        self.connected = false;
        Ok(())
    }

    async fn change_directory(&mut self, path: &str) -> Result<bool, TransferError> {
        let resolved = self.resolve(path)?;
        match tokio::fs::metadata(&resolved).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io("cwd", path, e)),
        }
    }

    async fn ensure_directory(&mut self, path: &str) -> Result<(), TransferError> {
        let resolved = self.resolve(path)?;
        tokio::fs::create_dir_all(&resolved)
            .await
            .map_err(|e| map_io("mkdir", path, e))
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        let resolved = self.resolve(path)?;
        let mut reader = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| map_io("list", path, e))?;

        let mut entries = Vec::new();
        while let Some(dir_entry) = reader
            .next_entry()
            .await
            .map_err(|e| map_io("list", path, e))?
        {
            let Ok(file_type) = dir_entry.file_type().await else {
                continue;
            };
            let metadata = dir_entry.metadata().await.ok();
            entries.push(RemoteEntry {
                name: dir_entry.file_name().to_string_lossy().into_owned(),
                is_directory: file_type.is_dir(),
                is_file: file_type.is_file(),
                last_modified: metadata.and_then(|m| m.modified().ok()),
            });
        }

        // read_dir order is platform-dependent; keep listings deterministic
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(path, count = entries.len(), "listed directory");
        Ok(entries)
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError> {
        let resolved = self.resolve(remote)?;
        if let Some(parent) = resolved.parent()
            && !tokio::fs::try_exists(parent).await.unwrap_or(false)
        {
            return Err(TransferError::not_found(remote));
        }
        tokio::fs::copy(local, &resolved)
            .await
            .map_err(|source| TransferError::io(local, source))?;
        Ok(())
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), TransferError> {
        let resolved = self.resolve(remote)?;
        if !tokio::fs::try_exists(&resolved).await.unwrap_or(false) {
            return Err(TransferError::not_found(remote));
        }
        tokio::fs::copy(&resolved, local)
            .await
            .map_err(|source| TransferError::io(local, source))?;
        Ok(())
    }

    async fn remove(&mut self, remote: &str) -> Result<(), TransferError> {
        let resolved = self.resolve(remote)?;
        tokio::fs::remove_file(&resolved)
            .await
            .map_err(|e| map_io("delete", remote, e))
    }

    async fn remove_directory(&mut self, remote: &str) -> Result<(), TransferError> {
        let resolved = self.resolve(remote)?;
        tokio::fs::remove_dir(&resolved)
            .await
            .map_err(|e| map_io("rmdir", remote, e))
    }

    async fn last_modified(&mut self, remote: &str) -> Option<SystemTime> {
        let resolved = self.resolve(remote).ok()?;
        tokio::fs::metadata(&resolved).await.ok()?.modified().ok()
    }
}
