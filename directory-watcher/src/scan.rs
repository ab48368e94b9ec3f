//! Startup scan of the watch folder.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::IncludeMatcher;

/// List regular files directly under `folder` that match `matcher`.
///
/// Unreadable entries are skipped with a warning; a backlog scan is best
/// effort and new events still arrive through the watcher.
pub fn scan_existing(folder: &Path, matcher: &IncludeMatcher) -> Vec<PathBuf> {
    let start = std::time::Instant::now();
    let mut found = Vec::new();

    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to scan entry in {}: {e}", folder.display());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if matcher.matches(entry.path()) {
            found.push(entry.into_path());
        }
    }

    info!(
        "Found {} existing files in {} ({:?})",
        found.len(),
        folder.display(),
        start.elapsed()
    );
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_matching_top_level_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        File::create(root.join("b.pdf")).unwrap();
        File::create(root.join("A.DOCX")).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        fs::create_dir(root.join("archive.pdf")).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        File::create(root.join("sub").join("nested.pdf")).unwrap();

        let matcher = IncludeMatcher::new(&WatchConfig::default_patterns()).unwrap();
        let found = scan_existing(root, &matcher);

        assert_eq!(found, vec![root.join("A.DOCX"), root.join("b.pdf")]);
    }

    #[test]
    fn test_scan_of_empty_folder() {
        let temp_dir = TempDir::new().unwrap();
        let matcher = IncludeMatcher::new(&WatchConfig::default_patterns()).unwrap();

        assert!(scan_existing(temp_dir.path(), &matcher).is_empty());
    }
}
