//! # Shelf Protocol Library
//!
//! Wire types shared by the shelf daemon and its clients.
//!
//! ## Overview
//!
//! The daemon exposes a download directory through three operations: list
//! the eligible files, delete one by reference, and play one back. This crate
//! defines how those files are named on the wire:
//!
//! - **Directory entries**: `{name, path, shaSum}` triples returned by a listing
//! - **Fingerprints**: SHA-256 digests of an entry's path, echoed back to delete it
//! - **Path tokens**: hex-encoded paths used to request playback
//! - **Messages**: newline-delimited JSON requests and responses with HTTP-style status codes
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::messages::{PlayRequest, Request};
//! use protocol::token::{decode_path, encode_path};
//! use std::path::Path;
//!
//! let token = encode_path(Path::new("/downloads/video.mp4"));
//! assert_eq!(decode_path(&token).unwrap(), Path::new("/downloads/video.mp4"));
//!
//! let request = Request::Play(PlayRequest::new(token));
//! let line = serde_json::to_string(&request).unwrap();
//! assert!(line.starts_with(r#"{"Play""#));
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Request, response and entry definitions
//! - [`token`]: Fingerprints and path tokens
//! - [`error`]: Error types

pub mod error;
pub mod messages;
pub mod token;

pub use error::{ProtocolError, Result};
pub use messages::{
    DeleteOutcome, DeleteRequest, DirectoryEntry, PlayChunk, PlayRequest, Request, Response,
    StatusCode,
};
pub use token::{decode_path, encode_path, Fingerprint, FINGERPRINT_LENGTH};
