//! Loading and persisting manifests, locally and through a transport.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, instrument};

use super::{Manifest, ManifestError};
use crate::transport::{RemoteTransport, path};

/// Name of the manifest file inside each directory.
pub const MANIFEST_FILE_NAME: &str = "hashes.txt";

/// Suffix of legacy single-file digest sidecars (`<file>.sha256`).
pub const LEGACY_DIGEST_SUFFIX: &str = ".sha256";

/// Outcome of persisting a manifest to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteManifestWrite {
    /// `hashes.txt` was uploaded.
    Written,
    /// The manifest was empty and the remote `hashes.txt` was deleted.
    Removed,
    /// The manifest was empty and there was no remote `hashes.txt` to delete.
    Absent,
}

/// Returns true for sync metadata that must never be treated as payload.
#[must_use]
pub fn is_metadata_file(name: &str) -> bool {
    name == MANIFEST_FILE_NAME || name.ends_with(LEGACY_DIGEST_SUFFIX)
}

/// Reads the manifest in `directory`. A missing file yields an empty manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the file exists but cannot be read.
#[instrument(level = "debug", fields(directory = %directory.display()))]
pub async fn load_local(directory: &Path) -> Result<Manifest, ManifestError> {
    let manifest_path = directory.join(MANIFEST_FILE_NAME);
    match tokio::fs::read(&manifest_path).await {
        Ok(bytes) => {
            let manifest = Manifest::parse(&String::from_utf8_lossy(&bytes));
            debug!(entries = manifest.len(), "loaded local manifest");
            Ok(manifest)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Manifest::new()),
        Err(e) => Err(ManifestError::io(manifest_path, e)),
    }
}

/// Writes the manifest into `directory`, or removes the file when empty.
///
/// The new content is written to a sibling temp file and renamed over the old
/// one so readers never observe a half-written manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if writing, renaming or removing fails.
#[instrument(level = "debug", skip(manifest), fields(directory = %directory.display(), entries = manifest.len()))]
pub async fn save_local(directory: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let manifest_path = directory.join(MANIFEST_FILE_NAME);

    if manifest.is_empty() {
        return match tokio::fs::remove_file(&manifest_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ManifestError::io(manifest_path, e)),
        };
    }

    let staging_path = directory.join(format!(".{MANIFEST_FILE_NAME}.tmp"));
    tokio::fs::write(&staging_path, manifest.render())
        .await
        .map_err(|e| ManifestError::io(&staging_path, e))?;
    tokio::fs::rename(&staging_path, &manifest_path)
        .await
        .map_err(|e| ManifestError::io(&manifest_path, e))
}

/// Downloads and parses the manifest of `remote_directory`.
///
/// The manifest is staged in a temp file under `scratch_dir`, which is
/// removed before returning. A missing remote manifest yields an empty one.
///
/// # Errors
///
/// Returns [`ManifestError::Transfer`] for transport failures other than a
/// missing file, and [`ManifestError::Io`] for scratch file failures.
#[instrument(level = "debug", skip(transport, scratch_dir))]
pub async fn load_remote<T>(
    transport: &mut T,
    remote_directory: &str,
    scratch_dir: &Path,
) -> Result<Manifest, ManifestError>
where
    T: RemoteTransport + ?Sized,
{
    let remote_path = path::join(remote_directory, MANIFEST_FILE_NAME);
    let staged = tempfile::Builder::new()
        .prefix("manifest-")
        .tempfile_in(scratch_dir)
        .map_err(|e| ManifestError::io(scratch_dir, e))?;

    match transport.download(&remote_path, staged.path()).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!("no remote manifest");
            return Ok(Manifest::new());
        }
        Err(e) => return Err(e.into()),
    }

    let bytes = tokio::fs::read(staged.path())
        .await
        .map_err(|e| ManifestError::io(staged.path(), e))?;
    let manifest = Manifest::parse(&String::from_utf8_lossy(&bytes));
    debug!(entries = manifest.len(), "loaded remote manifest");
    Ok(manifest)
}

/// Persists the manifest of `remote_directory`.
///
/// A non-empty manifest is rendered to a scratch file and uploaded as
/// `hashes.txt`; an empty one causes the remote `hashes.txt` to be deleted.
///
/// # Errors
///
/// Returns [`ManifestError::Transfer`] if the upload or delete fails, and
/// [`ManifestError::Io`] for scratch file failures.
#[instrument(level = "debug", skip(transport, manifest, scratch_dir), fields(entries = manifest.len()))]
pub async fn save_remote<T>(
    transport: &mut T,
    remote_directory: &str,
    manifest: &Manifest,
    scratch_dir: &Path,
) -> Result<RemoteManifestWrite, ManifestError>
where
    T: RemoteTransport + ?Sized,
{
    let remote_path = path::join(remote_directory, MANIFEST_FILE_NAME);

    if manifest.is_empty() {
        return match transport.remove(&remote_path).await {
            Ok(()) => Ok(RemoteManifestWrite::Removed),
            Err(e) if e.is_not_found() => Ok(RemoteManifestWrite::Absent),
            Err(e) => Err(e.into()),
        };
    }

    let staged = tempfile::Builder::new()
        .prefix("manifest-")
        .tempfile_in(scratch_dir)
        .map_err(|e| ManifestError::io(scratch_dir, e))?;
    tokio::fs::write(staged.path(), manifest.render())
        .await
        .map_err(|e| ManifestError::io(staged.path(), e))?;

    transport.upload(staged.path(), &remote_path).await?;
    Ok(RemoteManifestWrite::Written)
}
