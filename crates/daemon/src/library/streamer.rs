//! Containment-checked streaming.
//!
//! Play requests carry a hex path token rather than a catalog reference, so
//! containment is checked again here. A candidate is served only when the
//! directory holding it is inside the download root. The check runs twice:
//! lexically before any filesystem access, and again on canonical paths so a
//! symlink inside the root cannot point the read outside it.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use protocol::{decode_path, PlayChunk, PlayRequest};
use tracing::{debug, warn};

use super::error::LibraryError;

/// Default chunk size for streaming (64KB).
pub const DEFAULT_CHUNK_SIZE: u32 = 64 * 1024;

/// Maximum chunk size (1MB).
pub const MAX_CHUNK_SIZE: u32 = 1024 * 1024;

/// Normalize a path without touching the filesystem.
///
/// `.` components are dropped and `..` removes the previous component. A
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Whether the directory containing `path` is `root` or lies below it.
///
/// Comparison is per path component, so `/downloads-evil/x` is not inside
/// `/downloads`.
pub fn parent_within(path: &Path, root: &Path) -> bool {
    path.parent().is_some_and(|parent| parent.starts_with(root))
}

/// Resolve `candidate` to a canonical regular file inside `root`.
pub fn resolve_within(root: &Path, candidate: &Path) -> Result<PathBuf, LibraryError> {
    if !candidate.is_absolute() {
        return Err(LibraryError::OutsideRoot(candidate.to_path_buf()));
    }

    let lexical = normalize_lexically(candidate);
    if !parent_within(&lexical, &normalize_lexically(root)) {
        return Err(LibraryError::OutsideRoot(candidate.to_path_buf()));
    }

    let canonical_root = fs::canonicalize(root)?;
    let canonical = fs::canonicalize(&lexical).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LibraryError::NotFound(candidate.to_path_buf())
        } else {
            LibraryError::Io(e)
        }
    })?;

    if !parent_within(&canonical, &canonical_root) {
        return Err(LibraryError::OutsideRoot(candidate.to_path_buf()));
    }

    if !fs::metadata(&canonical)?.is_file() {
        return Err(LibraryError::NotAFile(candidate.to_path_buf()));
    }

    Ok(canonical)
}

/// Decode the token in `request`, check containment and open the file.
pub fn open(root: &Path, request: &PlayRequest, chunk_size: u32) -> Result<FileStream, LibraryError> {
    let candidate = decode_path(&request.path)?;

    let path = resolve_within(root, &candidate).inspect_err(|e| {
        if matches!(e, LibraryError::OutsideRoot(_)) {
            warn!(
                candidate = %candidate.display(),
                root = %root.display(),
                "Play denied: path escapes download root"
            );
        }
    })?;

    FileStream::open(path, request.offset.unwrap_or(0), request.length, chunk_size)
}

/// Chunked reader over a byte range of one file.
///
/// Yields at least one chunk, even for an empty range, and marks the final
/// chunk with `is_last`.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    path: PathBuf,
    total_size: u64,
    position: u64,
    end: u64,
    chunk_size: u32,
    finished: bool,
}

impl FileStream {
    /// Open `path` for streaming `length` bytes starting at `offset`.
    ///
    /// A length running past the end of the file is cut at the end.
    pub fn open(
        path: PathBuf,
        offset: u64,
        length: Option<u64>,
        chunk_size: u32,
    ) -> Result<Self, LibraryError> {
        let mut file = File::open(&path)?;
        let total_size = file.metadata()?.len();

        if offset > total_size {
            return Err(LibraryError::InvalidOffset {
                offset,
                file_size: total_size,
            });
        }

        let end = match length {
            Some(length) => offset.saturating_add(length).min(total_size),
            None => total_size,
        };

        file.seek(SeekFrom::Start(offset))?;

        debug!(path = %path.display(), offset, end, total_size, "Opened file stream");

        Ok(Self {
            file,
            path,
            total_size,
            position: offset,
            end,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
            finished: false,
        })
    }

    /// Canonical path being streamed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the whole file.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Read the next chunk, or `None` once the last chunk has been returned.
    pub fn next_chunk(&mut self) -> Result<Option<PlayChunk>, LibraryError> {
        if self.finished {
            return Ok(None);
        }

        let want = (self.chunk_size as u64).min(self.end - self.position) as usize;
        let mut data = vec![0u8; want];
        let mut filled = 0;
        while filled < want {
            let n = self.file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data.truncate(filled);

        let offset = self.position;
        self.position += filled as u64;

        // A short read means the file shrank underneath us; end the stream there.
        let is_last = self.position >= self.end || filled < want;
        self.finished = is_last;

        Ok(Some(PlayChunk {
            offset,
            total_size: self.total_size,
            data,
            is_last,
        }))
    }
}

impl Iterator for FileStream {
    type Item = Result<PlayChunk, LibraryError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
