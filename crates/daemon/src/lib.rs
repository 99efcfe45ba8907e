//! # Shelf Daemon Library
//!
//! This crate provides the daemon behind `shelfd`, which manages a single
//! download directory on the local machine.
//!
//! ## Overview
//!
//! The daemon offers three operations on its download directory:
//!
//! - **List**: every eligible file, with a SHA-256 fingerprint of its path
//! - **Delete**: remove a file named by a `(path, fingerprint)` pair taken
//!   from a listing, but only while it is still listed
//! - **Play**: stream a file named by a hex path token, optionally a byte
//!   range of it, after checking it lies inside the download directory
//!
//! Clients talk to the daemon over a Unix Domain Socket restricted to the
//! owning user.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              Daemon Orchestrator              │
//! ├───────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────┐  │
//! │  │        IPC Server (Unix socket)         │  │
//! │  └─────────────────────────────────────────┘  │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │             Request Router              │  │
//! │  └─────────────────────────────────────────┘  │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │  Download Library (catalog, validator,  │  │
//! │  │            streamer)                    │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelfd::{Config, DaemonOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!
//!     let mut orchestrator = DaemonOrchestrator::new(config)?;
//!     orchestrator.start().await?;
//!
//!     // The daemon is now accepting connections.
//!     // Wait for shutdown signal...
//!
//!     orchestrator.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`library`]: Listing, deleting and streaming files
//! - [`ipc`]: Unix socket server and client
//! - [`router`]: Request dispatch and error-to-status mapping
//! - [`orchestrator`]: Main daemon coordinator

pub mod config;
pub mod ipc;
pub mod library;
pub mod orchestrator;
pub mod router;

// Re-export protocol for convenience
pub use protocol;

pub use config::Config;

pub use library::{DownloadLibrary, FileStream, LibraryError};

pub use router::{Reply, RequestRouter, RouterError};

pub use orchestrator::{DaemonOrchestrator, OrchestratorState};
