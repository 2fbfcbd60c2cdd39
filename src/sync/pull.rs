//! Pull: download-and-verify from the remote tree into a local install.
//!
//! Each remote directory is mirrored into the corresponding local directory.
//! Files are downloaded one at a time and only when the local copy cannot be
//! trusted. The local `hashes.txt` is a decision input only; a pull never
//! writes manifests.
//!
//! # Download Decision
//!
//! For every payload file in a remote listing:
//! 1. Manifest has a digest for the name: download unless the local file
//!    exists and hashes to that digest. An unreadable local file is
//!    re-downloaded.
//! 2. No manifest entry but the local file exists: keep it (pre-populated
//!    installs without manifests are trusted).
//! 3. Otherwise: download.
//!
//! `hashes.txt` and `*.sha256` entries are metadata and never downloaded.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{CancellationToken, ProgressSink, ProgressUpdate, SyncError};
use crate::hash::hash_file;
use crate::manifest::{self, Manifest, is_metadata_file};
use crate::transport::{RemoteTransport, path};

/// Default name of the first-install marker written into the local root.
pub const DEFAULT_MARKER_FILE: &str = ".assetsync-installed";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where to pull from and to.
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Remote directory mirrored by the local root.
    pub remote_root: String,
    /// Local install directory.
    pub local_root: PathBuf,
    /// First-install marker file name inside `local_root`; `None` disables it.
    pub marker_file: Option<String>,
}

impl PullOptions {
    /// Creates options with the default first-install marker.
    pub fn new(remote_root: impl Into<String>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
            local_root: local_root.into(),
            marker_file: Some(DEFAULT_MARKER_FILE.to_string()),
        }
    }

    /// Overrides or disables the first-install marker.
    #[must_use]
    pub fn with_marker_file(mut self, marker_file: Option<String>) -> Self {
        self.marker_file = marker_file;
        self
    }
}

/// Outcome of a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    /// Files downloaded.
    pub downloaded: usize,
    /// Payload files kept as-is.
    pub skipped: usize,
    /// Directories fully or partially processed.
    pub directories: usize,
    /// Directories whose remote side could not be entered.
    pub abandoned_directories: usize,
    /// Cancellation was observed before the traversal finished.
    pub cancelled: bool,
    /// This run created the first-install marker.
    pub first_install: bool,
}

impl PullSummary {
    fn absorb(&mut self, child: &Self) {
        self.downloaded += child.downloaded;
        self.skipped += child.skipped;
        self.directories += child.directories;
        self.abandoned_directories += child.abandoned_directories;
        self.cancelled |= child.cancelled;
    }
}

/// Why a payload file is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Local digest equals the manifest digest.
    DigestMatch,
    /// No manifest entry, but a local file already exists.
    PreexistingFile,
    /// A local directory occupies the file's path; it is never replaced.
    LocalDirectory,
}

/// Why a payload file is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadReason {
    /// No manifest entry and no local file.
    Missing,
    /// Manifest entry exists but the local file is gone.
    MissingLocal,
    /// Local digest differs from the manifest digest.
    DigestMismatch,
    /// The local file could not be hashed.
    DigestUnavailable,
}

/// Per-file pull decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullDecision {
    /// Keep the local file.
    Skip(SkipReason),
    /// Fetch the remote file.
    Download(DownloadReason),
}

/// Decides whether `file_name` must be downloaded into `local_path`.
pub async fn decide_download(
    manifest: &Manifest,
    file_name: &str,
    local_path: &Path,
) -> PullDecision {
    let metadata = tokio::fs::metadata(local_path).await.ok();
    if metadata.as_ref().is_some_and(std::fs::Metadata::is_dir) {
        warn!(path = %local_path.display(), "local directory in place of remote file, leaving it alone");
        return PullDecision::Skip(SkipReason::LocalDirectory);
    }
    let exists = metadata.is_some();

    let Some(expected) = manifest.get(file_name) else {
        return if exists {
            PullDecision::Skip(SkipReason::PreexistingFile)
        } else {
            PullDecision::Download(DownloadReason::Missing)
        };
    };

    if !exists {
        return PullDecision::Download(DownloadReason::MissingLocal);
    }

    match hash_file(local_path).await {
        Ok(actual) if actual == expected => PullDecision::Skip(SkipReason::DigestMatch),
        Ok(_) => PullDecision::Download(DownloadReason::DigestMismatch),
        Err(e) => {
            warn!(path = %local_path.display(), error = %e, "cannot hash local file, re-downloading");
            PullDecision::Download(DownloadReason::DigestUnavailable)
        }
    }
}

/// Runs a full pull on an already connected transport.
///
/// # Errors
///
/// Returns [`SyncError::Transfer`] when a listing or download fails,
/// [`SyncError::Manifest`] when a local manifest exists but cannot be read, and
/// [`SyncError::Local`] for local filesystem failures.
#[instrument(skip_all, fields(remote_root = %options.remote_root, local_root = %options.local_root.display()))]
pub async fn run_pull<T>(
    transport: &mut T,
    options: &PullOptions,
    token: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<PullSummary, SyncError>
where
    T: RemoteTransport + ?Sized,
{
    let mut summary = pull_directory(
        transport,
        token,
        progress,
        options.remote_root.clone(),
        options.local_root.clone(),
    )
    .await?;

    if summary.cancelled {
        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            "pull cancelled, partial state kept"
        );
        return Ok(summary);
    }

    if let Some(marker) = &options.marker_file {
        summary.first_install = write_install_marker(&options.local_root, marker).await?;
    }

    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        directories = summary.directories,
        abandoned = summary.abandoned_directories,
        first_install = summary.first_install,
        "pull complete"
    );
    Ok(summary)
}

fn pull_directory<'a, T>(
    transport: &'a mut T,
    token: &'a CancellationToken,
    progress: &'a dyn ProgressSink,
    remote_dir: String,
    local_dir: PathBuf,
) -> BoxFuture<'a, Result<PullSummary, SyncError>>
where
    T: RemoteTransport + ?Sized,
{
    Box::pin(async move {
        let mut summary = PullSummary::default();

        if token.is_cancelled() {
            summary.cancelled = true;
            return Ok(summary);
        }

        tokio::fs::create_dir_all(&local_dir)
            .await
            .map_err(|e| SyncError::local(&local_dir, e))?;

        if !transport.change_directory(&remote_dir).await? {
            debug!(remote_dir = %remote_dir, "remote directory missing, branch abandoned");
            summary.abandoned_directories = 1;
            return Ok(summary);
        }

        let manifest = manifest::load_local(&local_dir).await?;
        let entries = transport.list(&remote_dir).await?;
        summary.directories = 1;

        let total = entries
            .iter()
            .filter(|entry| entry.is_file && !is_metadata_file(&entry.name))
            .count();
        let mut completed = 0;

        for entry in entries {
            if token.is_cancelled() {
                summary.cancelled = true;
                return Ok(summary);
            }

            if !is_safe_name(&entry.name) {
                warn!(remote_dir = %remote_dir, name = %entry.name, "ignoring unsafe entry name");
                continue;
            }

            let remote_path = path::join(&remote_dir, &entry.name);
            let local_path = local_dir.join(&entry.name);

            if entry.is_directory {
                let child =
                    pull_directory(&mut *transport, token, progress, remote_path, local_path)
                        .await?;
                summary.absorb(&child);
                continue;
            }

            if !entry.is_file || is_metadata_file(&entry.name) {
                continue;
            }

            match decide_download(&manifest, &entry.name, &local_path).await {
                PullDecision::Skip(reason) => {
                    debug!(path = %remote_path, ?reason, "keeping local file");
                    summary.skipped += 1;
                }
                PullDecision::Download(reason) => {
                    debug!(path = %remote_path, ?reason, "downloading");
                    download_into_place(&mut *transport, &remote_path, &local_dir, &entry.name)
                        .await?;
                    summary.downloaded += 1;
                }
            }

            completed += 1;
            progress.report(ProgressUpdate::Count {
                completed,
                total,
                message: remote_dir.clone(),
            });
        }

        Ok(summary)
    })
}

/// Entry names from a listing must stay inside the directory being mirrored.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Downloads into a `.part` sibling and renames it over the target, so a
/// file is either fully replaced or left untouched.
async fn download_into_place<T>(
    transport: &mut T,
    remote_path: &str,
    local_dir: &Path,
    file_name: &str,
) -> Result<(), SyncError>
where
    T: RemoteTransport + ?Sized,
{
    let target = local_dir.join(file_name);
    let partial = local_dir.join(format!(".{file_name}.part"));

    if let Err(e) = transport.download(remote_path, &partial).await {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await
            && cleanup.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %partial.display(), error = %cleanup, "failed to remove partial download");
        }
        return Err(e.into());
    }

    tokio::fs::rename(&partial, &target)
        .await
        .map_err(|e| SyncError::local(&target, e))
}

/// Writes the marker if absent. Returns true if this call created it.
async fn write_install_marker(local_root: &Path, marker: &str) -> Result<bool, SyncError> {
    let marker_path = local_root.join(marker);
    if tokio::fs::try_exists(&marker_path).await.unwrap_or(false) {
        return Ok(false);
    }
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    tokio::fs::write(&marker_path, format!("{stamp}\n"))
        .await
        .map_err(|e| SyncError::local(&marker_path, e))?;
    info!(marker = %marker_path.display(), "first install completed");
    Ok(true)
}
