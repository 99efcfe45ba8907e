//! Directory catalog.
//!
//! The catalog is recomputed from disk for every request. Listing and delete
//! validation both go through [`walk`], so they always agree about which
//! files exist.

use std::path::Path;

use protocol::DirectoryEntry;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::LibraryError;
use super::fingerprint::fingerprint_path;

/// Suffixes of files a download is still writing.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl"];

/// Whether a file name may appear in the catalog.
///
/// Hidden files and in-progress transfer artifacts are excluded.
pub fn is_eligible_name(name: &str) -> bool {
    !name.starts_with('.') && !PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Whether a walked entry belongs in the catalog.
///
/// Only regular files qualify. Links are not followed, so a symlink is never
/// eligible even when it points at a regular file.
pub fn is_eligible(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file() && is_eligible_name(&entry.file_name().to_string_lossy())
}

/// Walk `root` recursively and return its eligible entries.
///
/// Siblings are visited in file name order. Any unreadable directory aborts
/// the walk. Paths that are not valid UTF-8 cannot be sent to clients and are
/// skipped.
pub fn walk(root: &Path) -> Result<Vec<DirectoryEntry>, LibraryError> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for item in walker {
        let item = item?;

        if !is_eligible(&item) {
            continue;
        }

        let Some(path) = item.path().to_str() else {
            warn!(path = ?item.path(), "Skipping entry with non UTF-8 path");
            continue;
        };

        entries.push(DirectoryEntry {
            name: item.file_name().to_string_lossy().into_owned(),
            path: path.to_string(),
            fingerprint: fingerprint_path(item.path()),
        });
    }

    debug!(root = %root.display(), count = entries.len(), "Catalog walked");
    Ok(entries)
}
