//! Per-directory content manifests (`hashes.txt`).
//!
//! A manifest maps the names of files directly inside one directory to their
//! content digests. It lives in the directory it describes and never covers
//! subdirectories; every directory level has its own.
//!
//! # File Format
//!
//! UTF-8 text, one `"<fileName> <hexDigest>"` entry per line. Lines are split
//! at the **last** space because file names may contain spaces while digests
//! never do. Leading/trailing whitespace is trimmed, blank lines are ignored
//! and lines without a space are skipped.
//!
//! ```
//! use assetsync_core::manifest::Manifest;
//!
//! let manifest = Manifest::parse("my file.txt abc123\nb.png def456\n");
//! assert_eq!(manifest.get("my file.txt"), Some("abc123"));
//! assert_eq!(manifest.len(), 2);
//! ```

mod error;
mod store;

use std::collections::BTreeMap;
use std::fmt;

pub use error::ManifestError;
pub use store::{
    LEGACY_DIGEST_SUFFIX, MANIFEST_FILE_NAME, RemoteManifestWrite, is_metadata_file, load_local,
    load_remote, save_local, save_remote,
};

/// One manifest line: a bare file name and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// File name, never a path.
    pub file_name: String,
    /// Lowercase hex digest.
    pub digest: String,
}

impl ManifestEntry {
    /// Parses one manifest line, splitting at the last space.
    ///
    /// Returns `None` for blank lines and lines without a space.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let (file_name, digest) = line.rsplit_once(' ')?;
        let file_name = file_name.trim_end();
        if file_name.is_empty() || digest.is_empty() {
            return None;
        }
        Some(Self {
            file_name: file_name.to_string(),
            digest: digest.to_string(),
        })
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.file_name, self.digest)
    }
}

/// In-memory manifest for a single directory.
///
/// Entry order carries no meaning; rendering is sorted by name so rewritten
/// files are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses manifest text. Malformed lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(ManifestEntry::parse_line)
            .map(|entry| (entry.file_name, entry.digest))
            .collect();
        Self { entries }
    }

    /// Renders the manifest as newline-joined `"<name> <digest>"` lines.
    #[must_use]
    pub fn render(&self) -> String {
        self.iter()
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the digest recorded for `file_name`.
    #[must_use]
    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    /// Records `digest` for `file_name`.
    ///
    /// Returns `true` if the manifest changed (new entry or different digest).
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidEntryName`] if the name is empty,
    /// contains a path separator or a line break, starts or ends with
    /// whitespace, or is the manifest file itself.
    pub fn insert(
        &mut self,
        file_name: impl Into<String>,
        digest: impl Into<String>,
    ) -> Result<bool, ManifestError> {
        let file_name = file_name.into();
        validate_entry_name(&file_name)?;
        let digest = digest.into();
        let changed = self.get(&file_name) != Some(digest.as_str());
        self.entries.insert(file_name, digest);
        Ok(changed)
    }

    /// Removes the entry for `file_name`, returning its digest.
    pub fn remove(&mut self, file_name: &str) -> Option<String> {
        self.entries.remove(file_name)
    }

    /// Removes `name` and every entry under `"<name>/"`.
    ///
    /// Returns the number of entries removed.
    pub fn purge(&mut self, name: &str) -> usize {
        let prefix = format!("{name}/");
        let before = self.entries.len();
        self.entries
            .retain(|file_name, _| file_name != name && !file_name.starts_with(&prefix));
        before - self.entries.len()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = ManifestEntry> + '_ {
        self.entries.iter().map(|(file_name, digest)| ManifestEntry {
            file_name: file_name.clone(),
            digest: digest.clone(),
        })
    }
}

fn validate_entry_name(name: &str) -> Result<(), ManifestError> {
    let invalid = name.is_empty()
        || name.contains(['/', '\\', '\n', '\r'])
        // Parsing trims each line, so edge whitespace would not survive a reload
        || name.trim() != name
        || name == MANIFEST_FILE_NAME
        || name == "."
        || name == "..";
    if invalid {
        return Err(ManifestError::invalid_entry_name(name));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_splits_at_last_space() {
        let entry = ManifestEntry::parse_line("my file.txt abc123").unwrap();
        assert_eq!(entry.file_name, "my file.txt");
        assert_eq!(entry.digest, "abc123");
    }

    #[test]
    fn test_parse_line_trims_whitespace() {
        let entry = ManifestEntry::parse_line("  a.png   deadbeef \r").unwrap();
        assert_eq!(entry.file_name, "a.png");
        assert_eq!(entry.digest, "deadbeef");
    }

    #[test]
    fn test_parse_line_without_space_is_skipped() {
        assert!(ManifestEntry::parse_line("nodigesthere").is_none());
        assert!(ManifestEntry::parse_line("").is_none());
        assert!(ManifestEntry::parse_line("   ").is_none());
    }

    #[test]
    fn test_parse_ignores_blank_and_malformed_lines() {
        let manifest = Manifest::parse("a.png h1\n\ngarbage\nb.png h2\n");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("a.png"), Some("h1"));
        assert_eq!(manifest.get("b.png"), Some("h2"));
        assert_eq!(manifest.get("garbage"), None);
    }

    #[test]
    fn test_parse_windows_line_endings() {
        let manifest = Manifest::parse("a.png h1\r\nb.png h2\r\n");
        assert_eq!(manifest.get("a.png"), Some("h1"));
        assert_eq!(manifest.get("b.png"), Some("h2"));
    }

    #[test]
    fn test_parse_duplicate_names_last_wins() {
        let manifest = Manifest::parse("a.png h1\na.png h2");
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("a.png"), Some("h2"));
    }

    #[test]
    fn test_render_parse_preserves_entries() {
        let mut manifest = Manifest::new();
        manifest.insert("my file.txt", "abc123").unwrap();
        manifest.insert("b.png", "def456").unwrap();

        assert_eq!(Manifest::parse(&manifest.render()), manifest);
    }

    #[test]
    fn test_insert_rejects_names_that_would_not_reload() {
        let mut manifest = Manifest::new();
        for name in ["a.png ", " a.png", "a.png\t"] {
            assert!(
                matches!(
                    manifest.insert(name, "h"),
                    Err(ManifestError::InvalidEntryName { .. })
                ),
                "expected {name:?} to be rejected"
            );
        }

        manifest.insert("a b.png", "h1").unwrap();
        assert_eq!(Manifest::parse(&manifest.render()), manifest);
    }

    #[test]
    fn test_render_format() {
        let mut manifest = Manifest::new();
        manifest.insert("b.png", "h2").unwrap();
        manifest.insert("a.png", "h1").unwrap();
        assert_eq!(manifest.render(), "a.png h1\nb.png h2");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(Manifest::new().render(), "");
    }

    #[test]
    fn test_insert_reports_change() {
        let mut manifest = Manifest::new();
        assert!(manifest.insert("a.png", "h1").unwrap());
        assert!(!manifest.insert("a.png", "h1").unwrap());
        assert!(manifest.insert("a.png", "h2").unwrap());
    }

    #[test]
    fn test_insert_rejects_paths_and_reserved_names() {
        let mut manifest = Manifest::new();
        for name in ["", "skins/a.png", "skins\\a.png", "a\nb", "hashes.txt", ".."] {
            assert!(
                matches!(
                    manifest.insert(name, "h"),
                    Err(ManifestError::InvalidEntryName { .. })
                ),
                "expected {name:?} to be rejected"
            );
        }
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_remove_entry() {
        let mut manifest = Manifest::parse("a.png h1\nb.png h2");
        assert_eq!(manifest.remove("a.png"), Some("h1".to_string()));
        assert_eq!(manifest.remove("a.png"), None);
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_purge_removes_name_and_nested_entries() {
        let manifest_text = "skins h0\nskins/a.png h1\nskins/b.png h2\nskinsx.png h3\nother.png h4";
        let mut manifest = Manifest::parse(manifest_text);

        assert_eq!(manifest.purge("skins"), 3);
        assert_eq!(manifest.get("skinsx.png"), Some("h3"));
        assert_eq!(manifest.get("other.png"), Some("h4"));
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_iter_in_name_order() {
        let manifest = Manifest::parse("c h3\na h1\nb h2");
        let names: Vec<String> = manifest.iter().map(|e| e.file_name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
