//! Error types for the hash module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while computing a file digest.
#[derive(Debug, Error)]
pub enum HashError {
    /// The file could not be opened.
    #[error("cannot open {path} for hashing: {source}")]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A read failed part way through the file.
    #[error("read error while hashing {path}: {source}")]
    Read {
        /// File being hashed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Creates an open error.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a mid-stream read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
