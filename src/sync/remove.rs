//! Removal of a remote file or directory tree, with manifest cleanup.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::SyncError;
use crate::manifest::{self, RemoteManifestWrite};
use crate::transport::{RemoteTransport, TransferError, path};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveSummary {
    /// Files deleted, including those inside a removed directory.
    pub removed_files: usize,
    /// Directories deleted.
    pub removed_directories: usize,
    /// Entries dropped from the owning directory's manifest.
    pub manifest_entries_purged: usize,
}

/// Removes `relative_path` below `remote_root` and purges it from the owning
/// directory's manifest.
///
/// A directory target is emptied recursively and then removed. If that fails,
/// a plain file removal is attempted before giving up. A target that is
/// already gone is not an error, so stale manifest entries can still be
/// purged.
///
/// # Errors
///
/// Returns [`SyncError::InvalidRemovePath`] when the path does not name
/// anything below the root, [`SyncError::Transfer`] when deletion fails, and
/// [`SyncError::Manifest`] when the manifest cannot be updated.
#[instrument(skip(transport, scratch_dir))]
pub async fn run_remove<T>(
    transport: &mut T,
    remote_root: &str,
    relative_path: &str,
    scratch_dir: &Path,
) -> Result<RemoveSummary, SyncError>
where
    T: RemoteTransport + ?Sized,
{
    let normalized = path::normalize_relative(relative_path);
    if normalized.is_empty() || path::segments(&normalized).any(|segment| segment == "..") {
        return Err(SyncError::InvalidRemovePath {
            path: relative_path.to_string(),
        });
    }

    let target = path::join(remote_root, &normalized);
    let (relative_parent, name) = normalized
        .rsplit_once('/')
        .map_or(("", normalized.as_str()), |(parent, name)| (parent, name));
    let parent = path::join(remote_root, relative_parent);

    let mut summary = RemoveSummary::default();

    if transport.change_directory(&target).await? {
        // Step out so the directory is not in use while it is deleted.
        transport.change_directory(&parent).await?;
        let mut tree = RemoveSummary::default();
        match remove_tree(transport, target.clone(), &mut tree).await {
            Ok(()) => {
                summary = tree;
            }
            Err(tree_error) => {
                warn!(path = %target, error = %tree_error, "directory removal failed, trying plain removal");
                if transport.remove(&target).await.is_err() {
                    return Err(tree_error.into());
                }
                summary.removed_files = 1;
            }
        }
    } else {
        match transport.remove(&target).await {
            Ok(()) => summary.removed_files = 1,
            Err(e) if e.is_not_found() => debug!(path = %target, "already absent"),
            Err(e) => return Err(e.into()),
        }
    }

    let mut manifest = manifest::load_remote(transport, &parent, scratch_dir).await?;
    summary.manifest_entries_purged = manifest.purge(name);
    if summary.manifest_entries_purged > 0 {
        match manifest::save_remote(transport, &parent, &manifest, scratch_dir).await? {
            RemoteManifestWrite::Written => debug!(directory = %parent, "manifest rewritten"),
            RemoteManifestWrite::Removed | RemoteManifestWrite::Absent => {
                debug!(directory = %parent, "manifest now empty");
            }
        }
    }

    info!(
        files = summary.removed_files,
        directories = summary.removed_directories,
        purged = summary.manifest_entries_purged,
        "removal complete"
    );
    Ok(summary)
}

/// Deletes the contents of `directory` depth-first, then the directory.
fn remove_tree<'a, T>(
    transport: &'a mut T,
    directory: String,
    summary: &'a mut RemoveSummary,
) -> BoxFuture<'a, Result<(), TransferError>>
where
    T: RemoteTransport + ?Sized,
{
    Box::pin(async move {
        for entry in transport.list(&directory).await? {
            let child = path::join(&directory, &entry.name);
            if entry.is_directory {
                remove_tree(&mut *transport, child, &mut *summary).await?;
            } else {
                transport.remove(&child).await?;
                summary.removed_files += 1;
            }
        }
        transport.remove_directory(&directory).await?;
        summary.removed_directories += 1;
        Ok(())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::transport::LocalTransport;
    use tempfile::TempDir;

    async fn connected(remote: &TempDir) -> LocalTransport {
        let mut transport = LocalTransport::new(remote.path());
        transport.connect().await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_remove_rejects_escaping_path() {
        let remote = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let mut transport = connected(&remote).await;

        for bad in ["", "/", "../etc/passwd", "a/../../b"] {
            let err = run_remove(&mut transport, "assets", bad, scratch.path())
                .await
                .unwrap_err();
            assert!(
                matches!(err, SyncError::InvalidRemovePath { .. }),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_remove_missing_file_still_purges_manifest() {
        let remote = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::create_dir_all(remote.path().join("assets/skins")).unwrap();
        std::fs::write(
            remote.path().join("assets/skins/hashes.txt"),
            "a.png H1\nb.png H2\n",
        )
        .unwrap();
        let mut transport = connected(&remote).await;

        let summary = run_remove(&mut transport, "assets", "skins/a.png", scratch.path())
            .await
            .unwrap();

        assert_eq!(summary.removed_files, 0);
        assert_eq!(summary.manifest_entries_purged, 1);
        let text = std::fs::read_to_string(remote.path().join("assets/skins/hashes.txt")).unwrap();
        assert_eq!(Manifest::parse(&text).get("b.png"), Some("H2"));
        assert_eq!(Manifest::parse(&text).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_nested_directory_counts() {
        let remote = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::create_dir_all(remote.path().join("assets/skins/hd")).unwrap();
        std::fs::write(remote.path().join("assets/skins/a.png"), b"a").unwrap();
        std::fs::write(remote.path().join("assets/skins/hd/b.png"), b"b").unwrap();
        let mut transport = connected(&remote).await;

        let summary = run_remove(&mut transport, "assets", "skins", scratch.path())
            .await
            .unwrap();

        assert_eq!(summary.removed_files, 2);
        assert_eq!(summary.removed_directories, 2);
        assert!(!remote.path().join("assets/skins").exists());
        assert!(remote.path().join("assets").is_dir());
    }
}
