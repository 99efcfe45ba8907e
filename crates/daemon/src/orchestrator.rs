//! Daemon orchestrator for wiring together all components.
//!
//! The `DaemonOrchestrator` owns the download library, the request router and
//! the IPC listener. It runs one accept loop and one task per client
//! connection, all observing a shared cancellation token.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use protocol::StatusCode;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::ipc::{IpcConnection, IpcError, IpcServer};
use crate::library::DownloadLibrary;
use crate::router::{RequestRouter, SharedRouter};

/// Daemon orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Initial state, not started.
    Stopped,
    /// Starting up, binding the socket.
    Starting,
    /// Running and accepting connections.
    Running,
    /// Shutting down gracefully.
    ShuttingDown,
}

/// Daemon orchestrator that manages all subsystems.
pub struct DaemonOrchestrator {
    /// Socket the listener binds to.
    socket_path: PathBuf,
    /// Current state.
    state: Arc<RwLock<OrchestratorState>>,
    /// Request router shared with connection tasks.
    router: SharedRouter,
    /// Accept loop task, present while running.
    accept_task: Option<JoinHandle<()>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl DaemonOrchestrator {
    /// Creates a new daemon orchestrator from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let root = &config.library.download_path;
        if !root.is_dir() {
            warn!(
                "Download directory {} does not exist yet; listing will fail until it does",
                root.display()
            );
        }

        let library = DownloadLibrary::new(root.clone()).with_chunk_size(config.library.chunk_size);
        info!(
            "Serving download directory {} (chunk size {} bytes)",
            library.root().display(),
            library.chunk_size()
        );

        Ok(Self {
            socket_path: config.socket_path(),
            state: Arc::new(RwLock::new(OrchestratorState::Stopped)),
            router: Arc::new(RequestRouter::new(library)),
            accept_task: None,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Returns the current state.
    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Path of the IPC socket.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Returns the request router.
    pub fn router(&self) -> &SharedRouter {
        &self.router
    }

    /// Starts the daemon: binds the socket and begins accepting clients.
    pub async fn start(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != OrchestratorState::Stopped {
                anyhow::bail!("Orchestrator is already running");
            }
            *state = OrchestratorState::Starting;
        }

        info!("Starting daemon orchestrator...");

        let server = match IpcServer::bind(&self.socket_path).await {
            Ok(server) => server,
            Err(e) => {
                *self.state.write().await = OrchestratorState::Stopped;
                return Err(e).with_context(|| {
                    format!("Failed to bind IPC socket {}", self.socket_path.display())
                });
            }
        };
        info!("Listening on {}", server.path().display());

        let router = Arc::clone(&self.router);
        let shutdown_token = self.shutdown_token.clone();
        self.accept_task = Some(tokio::spawn(async move {
            Self::accept_loop(server, router, shutdown_token).await;
        }));

        *self.state.write().await = OrchestratorState::Running;
        info!("Daemon orchestrator started successfully");
        Ok(())
    }

    async fn accept_loop(server: IpcServer, router: SharedRouter, shutdown_token: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    debug!("Accept loop shutting down");
                    break;
                }
                accepted = server.accept() => match accepted {
                    Ok(conn) => {
                        debug!("Accepted IPC connection");
                        let router = Arc::clone(&router);
                        let token = shutdown_token.clone();
                        tokio::spawn(async move {
                            Self::handle_connection(conn, router, token).await;
                        });
                    }
                    Err(e) => warn!("Failed to accept IPC connection: {}", e),
                }
            }
        }
    }

    /// Serves requests on one connection until the client leaves or shutdown.
    async fn handle_connection(
        mut conn: IpcConnection,
        router: SharedRouter,
        shutdown_token: CancellationToken,
    ) {
        loop {
            let request = tokio::select! {
                _ = shutdown_token.cancelled() => break,
                request = conn.read_request() => request,
            };

            let result = match request {
                Ok(Some(request)) => router.serve(request, &mut conn).await,
                Ok(None) => {
                    debug!("IPC client disconnected");
                    break;
                }
                Err(IpcError::Json(e)) => {
                    warn!("Malformed request: {}", e);
                    conn.send_response(&protocol::Response::error(
                        StatusCode::BadRequest,
                        format!("malformed request: {}", e),
                    ))
                    .await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                debug!("Closing IPC connection: {}", e);
                break;
            }
        }
    }

    /// Stops the daemon orchestrator gracefully.
    pub async fn stop(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == OrchestratorState::Stopped {
                return Ok(());
            }
            if *state == OrchestratorState::ShuttingDown {
                anyhow::bail!("Orchestrator is already shutting down");
            }
            *state = OrchestratorState::ShuttingDown;
        }

        info!("Stopping daemon orchestrator...");

        // Signal shutdown to all tasks
        self.shutdown_token.cancel();

        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                warn!("Accept loop ended abnormally: {}", e);
            }
        }

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("Error removing socket {}: {}", self.socket_path.display(), e);
            }
        }

        *self.state.write().await = OrchestratorState::Stopped;
        info!("Daemon orchestrator stopped");
        Ok(())
    }

    /// Returns the shutdown token for external tasks to observe shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IpcConfig, LibraryConfig};
    use crate::ipc::IpcClient;
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> Config {
        let downloads = temp_dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();

        Config {
            library: LibraryConfig {
                download_path: downloads,
                ..Default::default()
            },
            ipc: IpcConfig {
                socket_path: Some(temp_dir.path().join("run").join("shelfd.sock")),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_orchestrator_creation() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = DaemonOrchestrator::new(create_test_config(&temp_dir)).unwrap();

        assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);
        assert_eq!(
            orchestrator.router().library().root(),
            temp_dir.path().join("downloads")
        );
    }

    #[tokio::test]
    async fn test_orchestrator_rejects_relative_root() {
        let mut config = Config::default();
        config.library.download_path = PathBuf::from("downloads");

        assert!(DaemonOrchestrator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_orchestrator_state_transitions() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = DaemonOrchestrator::new(create_test_config(&temp_dir)).unwrap();

        orchestrator.start().await.unwrap();
        assert_eq!(orchestrator.state().await, OrchestratorState::Running);
        assert!(orchestrator.socket_path().exists());
        assert!(orchestrator.start().await.is_err());

        orchestrator.stop().await.unwrap();
        assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);
        assert!(!orchestrator.socket_path().exists());
        assert!(orchestrator.shutdown_token().is_cancelled());

        // Stopping twice is a no-op
        orchestrator.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_orchestrator_answers_ping() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = DaemonOrchestrator::new(create_test_config(&temp_dir)).unwrap();
        orchestrator.start().await.unwrap();

        let mut client = IpcClient::connect(orchestrator.socket_path()).await.unwrap();
        assert!(client.ping().await.unwrap());

        orchestrator.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_line_keeps_connection_open() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = DaemonOrchestrator::new(create_test_config(&temp_dir)).unwrap();
        orchestrator.start().await.unwrap();

        let stream = tokio::net::UnixStream::connect(orchestrator.socket_path())
            .await
            .unwrap();
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"not json\n\"Ping\"\n").await.unwrap();

        let first: protocol::Response =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first.status(), StatusCode::BadRequest);

        let second: protocol::Response =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second, protocol::Response::Pong);

        orchestrator.stop().await.unwrap();
    }
}
