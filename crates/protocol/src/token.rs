//! Path tokens and entry fingerprints.
//!
//! Two kinds of references name a file on the wire:
//!
//! - A [`Fingerprint`] travels with every listed entry and must be echoed
//!   back, together with the entry's path, to delete it.
//! - A path token is the hex encoding of the raw path bytes and is what a
//!   client sends to play a file back.
//!
//! Neither is secret. The fingerprint proves which path was catalogued; the
//! token is just a transport-safe spelling of a path, so the receiving side
//! must still check containment after decoding it.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Length of a fingerprint digest in bytes (SHA-256).
pub const FINGERPRINT_LENGTH: usize = 32;

/// Hex-encoded digest identifying a catalogued path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a fingerprint from raw digest bytes.
    pub fn from_digest(digest: [u8; FINGERPRINT_LENGTH]) -> Self {
        Self(hex::encode(digest))
    }

    /// The lowercase hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `other` is exactly this fingerprint's hex form.
    ///
    /// No case folding: an uppercase spelling of the same digest does not match.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let mut digest = [0u8; FINGERPRINT_LENGTH];
        hex::decode_to_slice(s, &mut digest)
            .map_err(|e| ProtocolError::InvalidFingerprint(format!("{}: {}", s, e)))?;
        Ok(Self::from_digest(digest))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Encode a path as a play token.
pub fn encode_path(path: &Path) -> String {
    hex::encode(path.as_os_str().as_bytes())
}

/// Decode a play token back into a path.
///
/// Fails on an empty token, an odd number of digits or a non-hex character.
/// The decoded path is untrusted.
pub fn decode_path(token: &str) -> Result<PathBuf> {
    if token.is_empty() {
        return Err(ProtocolError::InvalidToken("empty path token".to_string()));
    }

    let bytes = hex::decode(token)?;
    if bytes.contains(&0) {
        return Err(ProtocolError::InvalidToken(
            "path contains a NUL byte".to_string(),
        ));
    }

    Ok(PathBuf::from(OsStr::from_bytes(&bytes)))
}
