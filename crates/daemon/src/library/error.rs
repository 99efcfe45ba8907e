//! Errors raised by download library operations.

use std::io;
use std::path::PathBuf;

use protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while listing, deleting or streaming files.
///
/// A delete request that matches no catalogued entry is not an error; it is
/// reported as [`protocol::DeleteOutcome::Mismatch`].
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The play token could not be decoded.
    #[error(transparent)]
    Token(#[from] ProtocolError),

    /// The resolved path lies outside the download root.
    #[error("path is outside the download root: {0}")]
    OutsideRoot(PathBuf),

    /// The requested file does not exist.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The requested path is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The requested offset is beyond the file size.
    #[error("invalid offset {offset} for file of size {file_size}")]
    InvalidOffset { offset: u64, file_size: u64 },

    /// A directory under the root could not be walked.
    #[error("cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<walkdir::Error> for LibraryError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        LibraryError::Walk {
            path,
            source: err.into(),
        }
    }
}
