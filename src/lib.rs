//! Assetsync Core Library
//!
//! Incremental folder synchronization between a remote file server and a local
//! install directory. Each directory carries a `hashes.txt` manifest mapping
//! file names to SHA-256 digests; only files whose digest is missing or stale
//! are transferred.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`hash`] - Content digests of files and in-memory buffers
//! - [`manifest`] - `hashes.txt` parsing, rendering and local/remote storage
//! - [`transport`] - Remote transfer port with FTP and directory-backed adapters
//! - [`sync`] - Pull, push and removal sessions, cancellation and progress

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod hash;
pub mod manifest;
pub mod sync;
pub mod transport;

// Re-export commonly used types
pub use hash::{HashError, hash_bytes, hash_file};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use sync::{
    CancellationToken, LaunchReadiness, NoProgress, ProgressSink, ProgressUpdate, PullCoordinator,
    PullOptions, PullSummary, PushFile, PushOptions, PushSummary, RemoveSummary, SyncError,
    SyncSession, prepare_launch,
};
pub use transport::{
    FtpConfig, FtpTransport, LocalTransport, RemoteEntry, RemoteTransport, TransferError,
};
