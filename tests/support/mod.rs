//! Shared utilities for sync integration tests.
//!
//! [`RecordingTransport`] wraps a [`LocalTransport`] rooted in a temp dir and
//! records every call, so tests can assert on what the engine transferred.
//! It can also inject failures and trigger cancellation after a number of
//! downloads.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use assetsync_core::transport::{LocalTransport, RemoteEntry, RemoteTransport, TransferError};
use assetsync_core::CancellationToken;
use async_trait::async_trait;
use tempfile::TempDir;

/// Shared, cloneable log of transport calls (`"<op> <path>"`).
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, op: &str, path: &str) {
        self.0.lock().unwrap().push(format!("{op} {path}"));
    }

    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Paths passed to calls of `op`.
    pub fn paths(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op} ");
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Number of calls of `op`.
    pub fn count(&self, op: &str) -> usize {
        self.paths(op).len()
    }
}

/// Transport wrapper that records calls and injects faults.
#[derive(Debug)]
pub struct RecordingTransport {
    inner: LocalTransport,
    log: CallLog,
    failures: Vec<(&'static str, String)>,
    hidden_directories: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    downloads: usize,
}

impl RecordingTransport {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalTransport::new(root),
            log: CallLog::default(),
            failures: Vec::new(),
            hidden_directories: Vec::new(),
            cancel_after: None,
            downloads: 0,
        }
    }

    /// Handle to the call log, valid after the transport is consumed.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Makes `op` fail for any path ending with `path_suffix`.
    pub fn fail(mut self, op: &'static str, path_suffix: &str) -> Self {
        self.failures.push((op, path_suffix.to_string()));
        self
    }

    /// Makes `change_directory` report `path_suffix` as missing.
    pub fn hide_directory(mut self, path_suffix: &str) -> Self {
        self.hidden_directories.push(path_suffix.to_string());
        self
    }

    /// Cancels `token` once `downloads` downloads have completed.
    pub fn cancel_after_downloads(mut self, downloads: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((downloads, token));
        self
    }

    fn check(&self, op: &'static str, path: &str) -> Result<(), TransferError> {
        let injected = self
            .failures
            .iter()
            .any(|(failing_op, suffix)| *failing_op == op && path.ends_with(suffix.as_str()));
        if injected {
            return Err(TransferError::protocol(op, path, "451 injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTransport for RecordingTransport {
    async fn connect(&mut self) -> Result<(), TransferError> {
        self.log.push("connect", "");
        self.check("connect", "")?;
        self.inner.connect().await
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        self.log.push("close", "");
        self.check("close", "")?;
        self.inner.close().await
    }

    async fn change_directory(&mut self, path: &str) -> Result<bool, TransferError> {
        self.log.push("cwd", path);
        self.check("cwd", path)?;
        if self
            .hidden_directories
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
        {
            return Ok(false);
        }
        self.inner.change_directory(path).await
    }

    async fn ensure_directory(&mut self, path: &str) -> Result<(), TransferError> {
        self.log.push("mkdir", path);
        self.check("mkdir", path)?;
        self.inner.ensure_directory(path).await
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        self.log.push("list", path);
        self.check("list", path)?;
        self.inner.list(path).await
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError> {
        self.log.push("upload", remote);
        self.check("upload", remote)?;
        self.inner.upload(local, remote).await
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), TransferError> {
        self.log.push("download", remote);
        self.check("download", remote)?;
        self.inner.download(remote, local).await?;
        self.downloads += 1;
        if let Some((limit, token)) = &self.cancel_after
            && self.downloads >= *limit
        {
            token.cancel();
        }
        Ok(())
    }

    async fn remove(&mut self, remote: &str) -> Result<(), TransferError> {
        self.log.push("remove", remote);
        self.check("remove", remote)?;
        self.inner.remove(remote).await
    }

    async fn remove_directory(&mut self, remote: &str) -> Result<(), TransferError> {
        self.log.push("rmdir", remote);
        self.check("rmdir", remote)?;
        self.inner.remove_directory(remote).await
    }

    async fn last_modified(&mut self, remote: &str) -> Option<SystemTime> {
        self.log.push("mdtm", remote);
        self.inner.last_modified(remote).await
    }
}

/// Writes `bytes` at `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Writes a `hashes.txt` in `root/relative_dir` with the given entries.
pub fn write_manifest(root: &Path, relative_dir: &str, entries: &[(&str, impl AsRef<str>)]) {
    let text: String = entries
        .iter()
        .map(|(name, digest)| format!("{name} {}\n", digest.as_ref()))
        .collect();
    write_file(root, &format!("{relative_dir}/hashes.txt"), text.as_bytes());
}

/// A fresh pair of remote and local temp roots.
pub fn roots() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}
