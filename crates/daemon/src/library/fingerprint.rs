//! Path fingerprints.

use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use protocol::Fingerprint;
use sha2::{Digest, Sha256};

/// Fingerprint a path: SHA-256 over its raw bytes, nothing else.
///
/// The same path always yields the same fingerprint. File content, size and
/// timestamps do not participate.
pub fn fingerprint_path(path: &Path) -> Fingerprint {
    let digest: [u8; 32] = Sha256::digest(path.as_os_str().as_bytes()).into();
    Fingerprint::from_digest(digest)
}
