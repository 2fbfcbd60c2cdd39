//! Remote transfer port for the asset repository.
//!
//! The sync engine never talks to a protocol client directly. It drives a
//! [`RemoteTransport`], which exposes the handful of file-store operations the
//! engine needs: listing, directory navigation, upload, download and removal.
//!
//! # Implementations
//!
//! - [`FtpTransport`] - FTP server, the production asset repository
//! - [`LocalTransport`] - a directory on a local or mounted filesystem
//!
//! # Path Conventions
//!
//! Remote paths always use `/` as the separator. Relative remote paths are
//! resolved against the transport's home directory (the FTP login directory,
//! or the root of a [`LocalTransport`]), never against the directory most
//! recently entered with [`RemoteTransport::change_directory`]. The engine
//! relies on this to build paths without tracking the working directory.
//!
//! # Error Classification
//!
//! Two outcomes are routine and never surface as errors:
//! - a missing directory makes [`RemoteTransport::change_directory`] return `false`
//! - an unavailable modification time makes [`RemoteTransport::last_modified`] return `None`
//!
//! Everything else is a [`TransferError`] and propagates to the session.

mod error;
mod ftp;
mod local;
pub mod path;

use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Serialize;

pub use error::TransferError;
pub use ftp::{DEFAULT_FTP_PORT, FtpConfig, FtpTransport};
pub use local::LocalTransport;

/// One entry returned by [`RemoteTransport::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    /// Entry name relative to the listed directory (never a path).
    pub name: String,
    /// Entry is a directory.
    pub is_directory: bool,
    /// Entry is a regular file.
    pub is_file: bool,
    /// Modification time, when the listing carries one.
    pub last_modified: Option<SystemTime>,
}

/// Connection to a remote file store.
///
/// A transport is not safe for concurrent use; every method takes `&mut self`
/// and the session that owns it drives one operation at a time.
///
/// `connect` and `close` bracket a session. `close` must tolerate being called
/// on a transport that never connected.
#[async_trait]
pub trait RemoteTransport: Send {
    /// Opens the connection and authenticates.
    async fn connect(&mut self) -> Result<(), TransferError>;

    /// Closes the connection. A no-op when not connected.
    async fn close(&mut self) -> Result<(), TransferError>;

    /// Enters `path`, returning `false` when the directory does not exist.
    async fn change_directory(&mut self, path: &str) -> Result<bool, TransferError>;

    /// Creates `path` and any missing ancestors. Idempotent.
    async fn ensure_directory(&mut self, path: &str) -> Result<(), TransferError>;

    /// Lists the entries directly inside `path`.
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransferError>;

    /// Uploads the local file at `local` to the remote path `remote`, replacing it.
    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError>;

    /// Downloads the remote file `remote` into the local path `local`, replacing it.
    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), TransferError>;

    /// Removes a remote file.
    async fn remove(&mut self, remote: &str) -> Result<(), TransferError>;

    /// Removes an empty remote directory.
    async fn remove_directory(&mut self, remote: &str) -> Result<(), TransferError>;

    /// Best-effort modification time of a remote file.
    async fn last_modified(&mut self, remote: &str) -> Option<SystemTime>;
}

#[async_trait]
impl<T: RemoteTransport + ?Sized> RemoteTransport for Box<T> {
    async fn connect(&mut self) -> Result<(), TransferError> {
        (**self).connect().await
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        (**self).close().await
    }

    async fn change_directory(&mut self, path: &str) -> Result<bool, TransferError> {
        (**self).change_directory(path).await
    }

    async fn ensure_directory(&mut self, path: &str) -> Result<(), TransferError> {
        (**self).ensure_directory(path).await
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        (**self).list(path).await
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError> {
        (**self).upload(local, remote).await
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), TransferError> {
        (**self).download(remote, local).await
    }

    async fn remove(&mut self, remote: &str) -> Result<(), TransferError> {
        (**self).remove(remote).await
    }

    async fn remove_directory(&mut self, remote: &str) -> Result<(), TransferError> {
        (**self).remove_directory(remote).await
    }

    async fn last_modified(&mut self, remote: &str) -> Option<SystemTime> {
        (**self).last_modified(remote).await
    }
}
