//! Push: upload a batch of in-memory files and keep remote manifests current.
//!
//! Files are grouped by the directory part of their relative path. For each
//! group the remote directory is created and entered, its `hashes.txt` is
//! loaded, every file is staged to a scratch file and uploaded, and the
//! manifest is written back when any entry changed.
//!
//! Failing to create or enter a target directory aborts the whole push: a
//! directory holding uploaded files without a matching manifest would be
//! inconsistent.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{CancellationToken, ProgressSink, ProgressUpdate, SyncError, progress::percent_of};
use crate::hash::hash_bytes;
use crate::manifest::{self, LEGACY_DIGEST_SUFFIX, MANIFEST_FILE_NAME, RemoteManifestWrite};
use crate::transport::{RemoteTransport, TransferError, path};

/// One file of a push batch: a relative path and its content.
#[derive(Clone, PartialEq, Eq)]
pub struct PushFile {
    relative_path: String,
    bytes: Vec<u8>,
}

impl PushFile {
    /// Validates and normalizes a batch entry.
    ///
    /// Backslashes are treated as separators and redundant separators are
    /// collapsed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPushFile`] for empty or absolute paths,
    /// `..` segments, line breaks, and names reserved for sync metadata.
    pub fn new(relative_path: &str, bytes: impl Into<Vec<u8>>) -> Result<Self, SyncError> {
        let raw = relative_path;
        if raw.starts_with('/') || raw.starts_with('\\') || has_drive_prefix(raw) {
            return Err(SyncError::invalid_push_file(raw, "path must be relative"));
        }
        if raw.contains(['\n', '\r']) {
            return Err(SyncError::invalid_push_file(raw, "path contains a line break"));
        }

        let normalized = path::normalize_relative(raw);
        if normalized.is_empty() {
            return Err(SyncError::invalid_push_file(raw, "path is empty"));
        }
        if path::segments(&normalized).any(|segment| segment == "..") {
            return Err(SyncError::invalid_push_file(
                raw,
                "parent directory segments are not allowed",
            ));
        }

        let file_name = normalized.rsplit('/').next().unwrap_or_default();
        if file_name == MANIFEST_FILE_NAME || file_name.ends_with(LEGACY_DIGEST_SUFFIX) {
            return Err(SyncError::invalid_push_file(
                raw,
                "name is reserved for sync metadata",
            ));
        }
        if file_name.trim() != file_name {
            return Err(SyncError::invalid_push_file(
                raw,
                "file name starts or ends with whitespace",
            ));
        }

        Ok(Self {
            relative_path: normalized,
            bytes: bytes.into(),
        })
    }

    /// Normalized `/`-separated relative path.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Directory part of the relative path (empty for top-level files).
    #[must_use]
    pub fn directory(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map_or("", |(directory, _)| directory)
    }

    /// File name part of the relative path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map_or(self.relative_path.as_str(), |(_, name)| name)
    }

    /// File content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for PushFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushFile")
            .field("relative_path", &self.relative_path)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Push behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    /// Skip files whose digest already matches the remote manifest entry.
    pub skip_unchanged: bool,
}

/// Outcome of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    /// Files uploaded.
    pub uploaded: usize,
    /// Files not uploaded because their digest was already recorded.
    pub skipped: usize,
    /// Remote directories processed.
    pub directories: usize,
    /// Manifests uploaded.
    pub manifests_written: usize,
    /// Manifests deleted because they became empty.
    pub manifests_removed: usize,
    /// Cancellation was observed before every file was processed.
    pub cancelled: bool,
}

/// Groups batch entries by their normalized directory.
#[must_use]
pub fn group_by_directory(files: &[PushFile]) -> BTreeMap<&str, Vec<&PushFile>> {
    let mut groups: BTreeMap<&str, Vec<&PushFile>> = BTreeMap::new();
    for file in files {
        groups.entry(file.directory()).or_default().push(file);
    }
    groups
}

/// Runs a push on an already connected transport.
///
/// `scratch_dir` receives one temp file per upload; each is deleted whether
/// or not its upload succeeds.
///
/// # Errors
///
/// Returns [`SyncError::Push`] naming the directory whose creation or upload
/// failed, [`SyncError::DirectoryUnavailable`] if a created directory cannot
/// be entered, and [`SyncError::PushManifest`] if a manifest cannot be read or
/// written.
#[instrument(skip_all, fields(remote_root = %remote_root, files = files.len()))]
pub async fn run_push<T>(
    transport: &mut T,
    remote_root: &str,
    files: &[PushFile],
    options: PushOptions,
    token: &CancellationToken,
    progress: &dyn ProgressSink,
    scratch_dir: &Path,
) -> Result<PushSummary, SyncError>
where
    T: RemoteTransport + ?Sized,
{
    let mut summary = PushSummary::default();
    let total = files.len();
    let mut done = 0;

    for (directory, group) in group_by_directory(files) {
        if token.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let remote_dir = path::join(remote_root, directory);
        transport
            .ensure_directory(&remote_dir)
            .await
            .map_err(|source| SyncError::push(&remote_dir, source))?;
        if !transport
            .change_directory(&remote_dir)
            .await
            .map_err(|source| SyncError::push(&remote_dir, source))?
        {
            return Err(SyncError::DirectoryUnavailable {
                directory: remote_dir,
            });
        }

        let mut manifest = manifest::load_remote(transport, &remote_dir, scratch_dir)
            .await
            .map_err(|source| SyncError::push_manifest(&remote_dir, source))?;
        let mut changed = false;

        for file in group {
            if token.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let digest = hash_bytes(file.bytes());
            let remote_path = path::join(&remote_dir, file.file_name());

            if options.skip_unchanged && manifest.get(file.file_name()) == Some(digest.as_str()) {
                debug!(path = %remote_path, "unchanged, not uploading");
                summary.skipped += 1;
            } else {
                upload_staged(transport, scratch_dir, file.bytes(), &remote_path)
                    .await
                    .map_err(|source| SyncError::push(&remote_dir, source))?;
                changed |= manifest
                    .insert(file.file_name(), digest)
                    .map_err(|source| SyncError::push_manifest(&remote_dir, source))?;
                summary.uploaded += 1;
            }

            done += 1;
            progress.report(ProgressUpdate::Count {
                completed: done,
                total,
                message: format!("Uploaded {}", file.relative_path()),
            });
        }

        if changed {
            let write = manifest::save_remote(transport, &remote_dir, &manifest, scratch_dir)
                .await
                .map_err(|source| SyncError::push_manifest(&remote_dir, source))?;
            match write {
                RemoteManifestWrite::Written => summary.manifests_written += 1,
                RemoteManifestWrite::Removed => summary.manifests_removed += 1,
                RemoteManifestWrite::Absent => {}
            }
        }
        summary.directories += 1;

        if summary.cancelled {
            break;
        }
    }

    if !summary.cancelled {
        progress.report(ProgressUpdate::Percent {
            percent: percent_of(done, total),
            message: "Upload complete".to_string(),
        });
    }

    info!(
        uploaded = summary.uploaded,
        skipped = summary.skipped,
        directories = summary.directories,
        manifests_written = summary.manifests_written,
        cancelled = summary.cancelled,
        "push complete"
    );
    Ok(summary)
}

/// Stages `bytes` in a fresh scratch file and uploads it to `remote_path`.
///
/// The scratch file is deleted on every path; a cleanup failure is logged and
/// never replaces an upload error.
async fn upload_staged<T>(
    transport: &mut T,
    scratch_dir: &Path,
    bytes: &[u8],
    remote_path: &str,
) -> Result<(), TransferError>
where
    T: RemoteTransport + ?Sized,
{
    let mut staged = tempfile::Builder::new()
        .prefix("push-")
        .tempfile_in(scratch_dir)
        .map_err(|e| TransferError::io(scratch_dir, e))?;
    staged
        .as_file_mut()
        .write_all(bytes)
        .and_then(|()| staged.as_file_mut().flush())
        .map_err(|e| TransferError::io(staged.path(), e))?;

    let result = transport.upload(staged.path(), remote_path).await;

    if let Err(e) = staged.close() {
        warn!(error = %e, "failed to remove push scratch file");
    }
    result
}
