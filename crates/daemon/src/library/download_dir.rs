//! The download directory handle used by request handlers.

use std::path::{Path, PathBuf};

use protocol::{DeleteOutcome, DeleteRequest, DirectoryEntry, PlayRequest};

use super::catalog;
use super::error::LibraryError;
use super::streamer::{self, FileStream, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use super::validator;

/// A download directory bound to its root.
///
/// Holds no state beyond configuration. Every operation walks or reads the
/// filesystem afresh, so the handle can be cloned freely across tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLibrary {
    root: PathBuf,
    chunk_size: u32,
}

impl DownloadLibrary {
    /// Create a library rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the chunk size used for playback, clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// The configured root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Playback chunk size.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// List the current catalog.
    pub fn list(&self) -> Result<Vec<DirectoryEntry>, LibraryError> {
        catalog::walk(&self.root)
    }

    /// Delete the entry referenced by `request` if it is catalogued right now.
    pub fn delete(&self, request: &DeleteRequest) -> Result<DeleteOutcome, LibraryError> {
        validator::delete_entry(&self.root, request)
    }

    /// Open the file named by the play token in `request`.
    pub fn play(&self, request: &PlayRequest) -> Result<FileStream, LibraryError> {
        streamer::open(&self.root, request, self.chunk_size)
    }
}
