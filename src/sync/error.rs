//! Error types for sync sessions.
//!
//! Only failures that must abort a session live here. Missing remote
//! directories during a pull, unreadable local files during digest comparison,
//! absent manifests and observed cancellation are handled inside the engine and
//! never become a [`SyncError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::transport::TransferError;

/// Errors that abort a sync session.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The transport could not connect.
    #[error("cannot open sync session: {0}")]
    Connect(#[source] TransferError),

    /// A transfer failed during a pull or removal.
    #[error("remote transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// A manifest could not be read or written.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// A push to a specific remote directory failed.
    #[error("push to {directory} failed: {source}")]
    Push {
        /// Remote directory being written.
        directory: String,
        /// The transfer failure.
        #[source]
        source: TransferError,
    },

    /// The manifest of a push target directory could not be read or written.
    #[error("manifest for {directory} could not be updated: {source}")]
    PushManifest {
        /// Remote directory whose manifest failed.
        directory: String,
        /// The manifest failure.
        #[source]
        source: ManifestError,
    },

    /// A push target directory could not be entered after creation.
    #[error("remote directory {directory} is unavailable after creation")]
    DirectoryUnavailable {
        /// Remote directory that could not be entered.
        directory: String,
    },

    /// A push batch entry was rejected at the boundary.
    #[error("invalid push file {path:?}: {reason}")]
    InvalidPushFile {
        /// The path as supplied by the caller.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A removal request did not name anything below the remote root.
    #[error("invalid removal path {path:?}")]
    InvalidRemovePath {
        /// The path as supplied by the caller.
        path: String,
    },

    /// Local filesystem error (creating directories, staging files).
    #[error("local IO error at {path}: {source}")]
    Local {
        /// Local path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Creates a push transfer error for `directory`.
    pub fn push(directory: impl Into<String>, source: TransferError) -> Self {
        Self::Push {
            directory: directory.into(),
            source,
        }
    }

    /// Creates a push manifest error for `directory`.
    pub fn push_manifest(directory: impl Into<String>, source: ManifestError) -> Self {
        Self::PushManifest {
            directory: directory.into(),
            source,
        }
    }

    /// Creates an invalid push file error.
    pub fn invalid_push_file(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPushFile {
            path: path.into(),
            reason,
        }
    }

    /// Creates a local IO error.
    pub fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Local {
            path: path.into(),
            source,
        }
    }

    /// Remote directory the failure concerns, when there is one.
    #[must_use]
    pub fn directory(&self) -> Option<&str> {
        match self {
            Self::Push { directory, .. }
            | Self::PushManifest { directory, .. }
            | Self::DirectoryUnavailable { directory } => Some(directory),
            _ => None,
        }
    }
}
