//! Error types for the transport module.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed protocol-level error from the underlying client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by a [`RemoteTransport`](super::RemoteTransport).
#[derive(Debug, Error)]
pub enum TransferError {
    /// The connection could not be established or authenticated.
    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        /// Host and port, or root directory, being connected to.
        endpoint: String,
        /// The underlying client error.
        #[source]
        source: BoxError,
    },

    /// An operation was attempted before `connect` or after `close`.
    #[error("transport is not connected")]
    NotConnected,

    /// The server rejected or failed an operation.
    #[error("{operation} failed for {path}: {source}")]
    Protocol {
        /// Operation name (`list`, `upload`, ...).
        operation: &'static str,
        /// Remote path the operation targeted.
        path: String,
        /// The underlying client error.
        #[source]
        source: BoxError,
    },

    /// A remote file or directory the operation needed does not exist.
    #[error("remote path not found: {path}")]
    NotFound {
        /// Missing remote path.
        path: String,
    },

    /// A remote path escapes the transport root or is otherwise unusable.
    #[error("invalid remote path: {path}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// Local file system error while staging a transfer.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Local path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking task running a client call panicked or was cancelled.
    #[error("{operation} task failed: {source}")]
    Task {
        /// Operation name.
        operation: &'static str,
        /// Join error from the runtime.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl TransferError {
    /// Creates a connection error.
    pub fn connect(endpoint: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    /// Creates a protocol error for `operation` on `path`.
    pub fn protocol(
        operation: &'static str,
        path: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Protocol {
            operation,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Creates a local IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error reports a missing remote path.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
