//! Unix Domain Socket transport between shelf clients and the daemon.
//!
//! ## Overview
//!
//! The IPC system uses a JSON newline-delimited protocol. Each message is a
//! single JSON object followed by a newline; request and response types live
//! in [`protocol::messages`]. A play request is answered by a run of `Chunk`
//! responses ending with `is_last`, every other request by one response.
//!
//! The socket is created with mode `0600` inside a `0700` directory. Only the
//! owning user can connect; there is no other authentication.
//!
//! ## Socket Path
//!
//! - Primary: `$XDG_RUNTIME_DIR/shelfd/shelfd.sock`
//! - Fallback: `/tmp/shelfd-$UID/shelfd.sock`
//!
//! ## Example
//!
//! ```rust,no_run
//! use shelfd::ipc::{get_socket_path, IpcClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = IpcClient::connect(&get_socket_path()).await?;
//!     for entry in client.list().await? {
//!         println!("{} {}", entry.fingerprint, entry.path);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod server;

pub use client::{IpcClient, PlaySummary};
pub use server::{IpcConnection, IpcError, IpcServer};

use std::path::PathBuf;

/// Get the socket path for IPC communication.
///
/// 1. If `$XDG_RUNTIME_DIR` is set: `$XDG_RUNTIME_DIR/shelfd/shelfd.sock`
/// 2. Otherwise: `/tmp/shelfd-$UID/shelfd.sock`
pub fn get_socket_path() -> PathBuf {
    use std::os::unix::fs::MetadataExt;

    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("shelfd").join("shelfd.sock")
    } else {
        // Get UID by checking metadata of a file we own
        let uid = std::fs::metadata("/proc/self")
            .map(|m| m.uid())
            .unwrap_or(0);

        PathBuf::from(format!("/tmp/shelfd-{}", uid)).join("shelfd.sock")
    }
}
