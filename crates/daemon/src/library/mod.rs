//! Download directory operations.
//!
//! This module implements the three operations the daemon offers on its
//! download directory:
//! - Listing eligible files, each with a path fingerprint
//! - Deleting a file by a `(path, fingerprint)` reference from a listing
//! - Streaming a file named by a hex path token
//!
//! # Security
//!
//! Deletes are only honoured for files present in a freshly walked catalog,
//! so hidden files, partial downloads and anything outside the root can never
//! be removed. Playback decodes an arbitrary client path, so it is checked for
//! containment lexically and again after canonicalization. Containment is
//! decided per path component, never by string prefix.

pub mod catalog;
pub mod download_dir;
pub mod error;
pub mod fingerprint;
pub mod streamer;
pub mod validator;

pub use download_dir::DownloadLibrary;
pub use error::LibraryError;
pub use fingerprint::fingerprint_path;
pub use streamer::{FileStream, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
