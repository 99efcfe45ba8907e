//! Request and response types exchanged between shelf clients and the daemon.
//!
//! Messages are JSON objects, one per line. Status codes reuse the HTTP
//! numbering so that a web front end can forward them unchanged.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::token::Fingerprint;

/// Status attached to every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum StatusCode {
    /// Request succeeded.
    Ok,
    /// A chunk of a byte-range delivery.
    PartialContent,
    /// Malformed request, such as an undecodable path token.
    BadRequest,
    /// The resolved path escapes the download root.
    Unauthorized,
    /// The referenced file does not exist.
    NotFound,
    /// The requested offset is beyond the end of the file.
    RangeNotSatisfiable,
    /// Server-side failure.
    InternalError,
}

impl StatusCode {
    /// Numeric code.
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::PartialContent => 206,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::RangeNotSatisfiable => 416,
            Self::InternalError => 500,
        }
    }

    /// Whether this is a 2xx code.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

impl From<StatusCode> for u16 {
    fn from(value: StatusCode) -> Self {
        value.as_u16()
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = ProtocolError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(Self::Ok),
            206 => Ok(Self::PartialContent),
            400 => Ok(Self::BadRequest),
            401 => Ok(Self::Unauthorized),
            404 => Ok(Self::NotFound),
            416 => Ok(Self::RangeNotSatisfiable),
            500 => Ok(Self::InternalError),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// One eligible file in the download directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Base file name.
    pub name: String,
    /// Path as produced by walking the download root.
    pub path: String,
    /// Digest of `path`.
    #[serde(rename = "shaSum")]
    pub fingerprint: Fingerprint,
}

/// Body of a delete request: an entry reference taken from a listing.
///
/// The fingerprint is kept as a plain string so that a malformed or stale
/// value is reported as a mismatch rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Path of the entry to delete.
    pub path: String,
    /// Fingerprint the client received with the entry.
    #[serde(rename = "shaSum")]
    pub fingerprint: String,
}

impl DeleteRequest {
    /// Build a delete request that references a listed entry.
    pub fn for_entry(entry: &DirectoryEntry) -> Self {
        Self {
            path: entry.path.clone(),
            fingerprint: entry.fingerprint.to_string(),
        }
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    /// The file was removed. `index` is its position in the catalog that
    /// validated the request.
    Removed {
        /// Zero-based catalog position.
        index: usize,
    },
    /// No current entry matches both path and fingerprint; nothing was removed.
    Mismatch,
}

impl DeleteOutcome {
    /// The catalog index for a removal, `None` for a mismatch.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Removed { index } => Some(*index),
            Self::Mismatch => None,
        }
    }
}

/// Body of a play request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRequest {
    /// Hex-encoded path token.
    pub path: String,
    /// First byte to deliver (default 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Maximum number of bytes to deliver (default: to end of file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

impl PlayRequest {
    /// Request the whole file behind `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            path: token.into(),
            offset: None,
            length: None,
        }
    }

    /// Restrict delivery to a byte range.
    pub fn with_range(mut self, offset: u64, length: Option<u64>) -> Self {
        self.offset = Some(offset);
        self.length = length;
        self
    }
}

/// A slice of file content delivered by a play request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayChunk {
    /// Offset of `data` within the file.
    pub offset: u64,
    /// Size of the whole file.
    pub total_size: u64,
    /// Chunk content, base64 on the wire.
    #[serde(with = "base64_data")]
    pub data: Vec<u8>,
    /// Whether this chunk ends the delivery.
    pub is_last: bool,
}

/// Requests that can be sent to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Check if the daemon is alive.
    Ping,
    /// Get the daemon status.
    Status,
    /// List the current catalog.
    List,
    /// Delete a catalogued file.
    Delete(DeleteRequest),
    /// Stream a file back.
    Play(PlayRequest),
}

/// Responses sent by the daemon.
///
/// A play request is answered by one or more `Chunk` responses, or by a
/// single `Error`. Every other request gets exactly one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Response to a Ping request.
    Pong,
    /// Current daemon status.
    Status {
        /// Configured download root.
        root: String,
        /// Uptime in seconds.
        uptime_secs: u64,
    },
    /// Current catalog.
    Entries {
        /// Eligible entries in traversal order.
        entries: Vec<DirectoryEntry>,
    },
    /// Outcome of a delete request.
    Deleted {
        /// Removed or mismatch.
        outcome: DeleteOutcome,
    },
    /// Part of a play delivery.
    Chunk(PlayChunk),
    /// The request failed.
    Error {
        /// Failure class.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },
}

impl Response {
    /// Status of this response.
    ///
    /// A delete mismatch is a successful response carrying a negative outcome.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Pong | Self::Status { .. } | Self::Entries { .. } | Self::Deleted { .. } => {
                StatusCode::Ok
            }
            Self::Chunk(_) => StatusCode::PartialContent,
            Self::Error { status, .. } => *status,
        }
    }

    /// Build an error response.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Error {
            status,
            message: message.into(),
        }
    }
}

mod base64_data {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
