//! Reference validation for deletes.
//!
//! A delete names a file by the `(path, fingerprint)` pair a listing handed
//! out. The pair is checked against a freshly walked catalog, so only a file
//! that is catalogued right now can be removed. Hidden files, partial
//! downloads and anything outside the root are never catalogued and
//! therefore never deletable.

use std::fs;
use std::path::Path;

use protocol::{DeleteOutcome, DeleteRequest, DirectoryEntry};
use tracing::{info, warn};

use super::catalog;
use super::error::LibraryError;

/// Position of the entry matching both the path and the fingerprint of `request`.
pub fn find_match(entries: &[DirectoryEntry], request: &DeleteRequest) -> Option<usize> {
    entries.iter().position(|entry| {
        entry.path == request.path && entry.fingerprint.matches(&request.fingerprint)
    })
}

/// Validate `request` against the current catalog of `root` and remove the
/// referenced file when it matches.
pub fn delete_entry(root: &Path, request: &DeleteRequest) -> Result<DeleteOutcome, LibraryError> {
    let entries = catalog::walk(root)?;

    let Some(index) = find_match(&entries, request) else {
        warn!(
            path = %request.path,
            fingerprint = %request.fingerprint,
            "Delete refused: no catalogued entry matches"
        );
        return Ok(DeleteOutcome::Mismatch);
    };

    let path = Path::new(&entries[index].path);
    fs::remove_file(path)?;

    info!(path = %path.display(), index, "Deleted file");
    Ok(DeleteOutcome::Removed { index })
}
