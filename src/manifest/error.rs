//! Error types for the manifest module.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransferError;

/// Errors raised while reading, mutating or persisting a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Local manifest could not be read or written.
    #[error("manifest IO error at {path}: {source}")]
    Io {
        /// Manifest path (or scratch path for remote manifests).
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Remote manifest transfer failed.
    #[error("remote manifest transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// An entry name was not a bare file name.
    #[error("invalid manifest entry name {name:?}: must be a bare file name")]
    InvalidEntryName {
        /// The rejected name.
        name: String,
    },
}

impl ManifestError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid entry name error.
    pub fn invalid_entry_name(name: impl Into<String>) -> Self {
        Self::InvalidEntryName { name: name.into() }
    }
}
