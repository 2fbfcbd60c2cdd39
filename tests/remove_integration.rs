//! Integration tests for remote removal and manifest purging.

mod support;

use assetsync_core::{CancellationToken, Manifest, RemoveSummary, SyncError, SyncSession};
use support::{RecordingTransport, roots, write_file, write_manifest};

async fn remove(transport: RecordingTransport, path: &str) -> Result<RemoveSummary, SyncError> {
    let session = SyncSession::open(transport, CancellationToken::new()).await?;
    session.remove("assets", path).await
}

#[tokio::test]
async fn test_remove_file_purges_manifest_entry() {
    let (remote, _local) = roots();
    write_file(remote.path(), "assets/skins/a.png", b"a");
    write_file(remote.path(), "assets/skins/b.png", b"b");
    write_manifest(remote.path(), "assets/skins", &[("a.png", "H1"), ("b.png", "H2")]);

    let summary = remove(RecordingTransport::new(remote.path()), "skins/a.png")
        .await
        .unwrap();

    assert_eq!(summary.removed_files, 1);
    assert_eq!(summary.manifest_entries_purged, 1);
    assert!(!remote.path().join("assets/skins/a.png").exists());

    let text = std::fs::read_to_string(remote.path().join("assets/skins/hashes.txt")).unwrap();
    let manifest = Manifest::parse(&text);
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.get("b.png"), Some("H2"));
}

#[tokio::test]
async fn test_remove_last_entry_deletes_manifest() {
    let (remote, _local) = roots();
    write_file(remote.path(), "assets/skins/a.png", b"a");
    write_manifest(remote.path(), "assets/skins", &[("a.png", "H1")]);

    remove(RecordingTransport::new(remote.path()), "skins/a.png")
        .await
        .unwrap();

    assert!(!remote.path().join("assets/skins/hashes.txt").exists());
    assert!(remote.path().join("assets/skins").is_dir());
}

#[tokio::test]
async fn test_remove_directory_recursively() {
    let (remote, _local) = roots();
    write_file(remote.path(), "assets/skins/a.png", b"a");
    write_file(remote.path(), "assets/skins/hd/b.png", b"b");
    write_manifest(remote.path(), "assets/skins", &[("a.png", "H1")]);
    write_manifest(
        remote.path(),
        "assets",
        &[("skins", "HD"), ("skins/a.png", "H1"), ("logo.png", "H3")],
    );

    let transport = RecordingTransport::new(remote.path());
    let log = transport.log();
    let summary = remove(transport, "skins").await.unwrap();

    assert!(!remote.path().join("assets/skins").exists());
    // a.png, hd/b.png, the nested hashes.txt
    assert_eq!(summary.removed_files, 3);
    assert_eq!(summary.removed_directories, 2);
    assert_eq!(summary.manifest_entries_purged, 2);
    assert_eq!(log.count("rmdir"), 2);

    let text = std::fs::read_to_string(remote.path().join("assets/hashes.txt")).unwrap();
    let manifest = Manifest::parse(&text);
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.get("logo.png"), Some("H3"));
}

#[tokio::test]
async fn test_remove_without_manifest_entry_leaves_manifest_untouched() {
    let (remote, _local) = roots();
    write_file(remote.path(), "assets/skins/a.png", b"a");
    write_manifest(remote.path(), "assets/skins", &[("b.png", "H2")]);

    let transport = RecordingTransport::new(remote.path());
    let log = transport.log();
    let summary = remove(transport, "skins/a.png").await.unwrap();

    assert_eq!(summary.manifest_entries_purged, 0);
    assert!(log.paths("upload").is_empty());
}

#[tokio::test]
async fn test_remove_failure_propagates() {
    let (remote, _local) = roots();
    write_file(remote.path(), "assets/skins/a.png", b"a");
    write_manifest(remote.path(), "assets/skins", &[("a.png", "H1")]);

    let transport = RecordingTransport::new(remote.path()).fail("remove", "skins/a.png");
    let log = transport.log();
    let err = remove(transport, "skins/a.png").await.unwrap_err();

    assert!(matches!(err, SyncError::Transfer(_)), "got {err:?}");
    assert_eq!(log.count("close"), 1);
    let text = std::fs::read_to_string(remote.path().join("assets/skins/hashes.txt")).unwrap();
    assert_eq!(Manifest::parse(&text).get("a.png"), Some("H1"));
}
