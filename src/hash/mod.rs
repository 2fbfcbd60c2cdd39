//! Content hashing for manifest digests.
//!
//! Digests are SHA-256, rendered as lowercase hex. Files are read in fixed
//! size chunks so memory use stays constant regardless of file size.
//!
//! # Example
//!
//! ```no_run
//! use assetsync_core::hash::{hash_bytes, hash_file};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let on_disk = hash_file(Path::new("mods/a.jar")).await?;
//! let in_memory = hash_bytes(b"hello");
//! println!("{on_disk} {in_memory}");
//! # Ok(())
//! # }
//! ```

mod error;

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{instrument, trace};

pub use error::HashError;

/// Read buffer size used while streaming a file through the hasher (64 KiB).
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Computes the hex digest of an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Computes the hex digest of a file by streaming its contents.
///
/// Nothing is returned unless the whole file was read; a read error part way
/// through yields [`HashError::Read`] rather than a digest of a prefix.
///
/// # Errors
///
/// Returns [`HashError::Open`] if the file cannot be opened and
/// [`HashError::Read`] if reading fails mid-stream.
#[instrument(level = "trace", fields(path = %path.display()))]
pub async fn hash_file(path: &Path) -> Result<String, HashError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|source| HashError::open(path, source))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|source| HashError::read(path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        total += read as u64;
    }

    trace!(bytes = total, "hashed file");
    Ok(hex::encode(hasher.finalize()))
}
