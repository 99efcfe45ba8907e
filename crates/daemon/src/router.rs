//! Request router for dispatching client requests to the download library.
//!
//! Library calls touch the filesystem and block, so each one runs on the
//! blocking thread pool. A play request streams one chunk per blocking call
//! so a slow reader never pins a worker for a whole file.

use std::sync::Arc;
use std::time::Instant;

use protocol::{Request, Response, StatusCode};
use tracing::{debug, error, info, warn};

use crate::ipc::{IpcConnection, IpcError};
use crate::library::{DownloadLibrary, FileStream, LibraryError};

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The library operation failed.
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The blocking task running the operation panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

impl RouterError {
    /// Status code reported to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::Library(e) => match e {
                LibraryError::Token(_) => StatusCode::BadRequest,
                LibraryError::NotAFile(_) => StatusCode::BadRequest,
                LibraryError::OutsideRoot(_) => StatusCode::Unauthorized,
                LibraryError::NotFound(_) => StatusCode::NotFound,
                LibraryError::InvalidOffset { .. } => StatusCode::RangeNotSatisfiable,
                LibraryError::Walk { .. } | LibraryError::Io(_) => StatusCode::InternalError,
            },
            RouterError::Blocking(_) => StatusCode::InternalError,
        }
    }

    /// Convert the error to a protocol error response.
    pub fn to_response(&self) -> Response {
        Response::error(self.status(), self.to_string())
    }
}

/// What the router produced for a request.
pub enum Reply {
    /// A single response.
    Single(Response),
    /// An open file to be streamed as chunk responses.
    Stream(FileStream),
}

/// Routes requests to the download library.
pub struct RequestRouter {
    library: DownloadLibrary,
    started_at: Instant,
}

impl RequestRouter {
    /// Create a router serving `library`.
    pub fn new(library: DownloadLibrary) -> Self {
        Self {
            library,
            started_at: Instant::now(),
        }
    }

    /// The library this router serves.
    pub fn library(&self) -> &DownloadLibrary {
        &self.library
    }

    /// Handle a request, producing either a response or a stream to deliver.
    ///
    /// Failures are turned into error responses here; nothing escapes.
    pub async fn dispatch(&self, request: Request) -> Reply {
        match self.route(request).await {
            Ok(reply) => reply,
            Err(e) => {
                log_failure(&e);
                Reply::Single(e.to_response())
            }
        }
    }

    async fn route(&self, request: Request) -> Result<Reply, RouterError> {
        debug!(?request, "Handling request");
        match request {
            Request::Ping => Ok(Reply::Single(Response::Pong)),
            Request::Status => Ok(Reply::Single(Response::Status {
                root: self.library.root().display().to_string(),
                uptime_secs: self.started_at.elapsed().as_secs(),
            })),
            Request::List => {
                let library = self.library.clone();
                let entries = tokio::task::spawn_blocking(move || library.list()).await??;
                debug!("Listed {} entries", entries.len());
                Ok(Reply::Single(Response::Entries { entries }))
            }
            Request::Delete(delete) => {
                info!("Delete requested for {}", delete.path);
                let library = self.library.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || library.delete(&delete)).await??;
                Ok(Reply::Single(Response::Deleted { outcome }))
            }
            Request::Play(play) => {
                let library = self.library.clone();
                let stream = tokio::task::spawn_blocking(move || library.play(&play)).await??;
                info!(
                    "Streaming {} ({} bytes)",
                    stream.path().display(),
                    stream.total_size()
                );
                Ok(Reply::Stream(stream))
            }
        }
    }

    /// Handle a request and write every resulting response to `conn`.
    ///
    /// A read failure in the middle of a stream ends it with an error
    /// response. Errors returned from here are transport failures only.
    pub async fn serve(&self, request: Request, conn: &mut IpcConnection) -> Result<(), IpcError> {
        match self.dispatch(request).await {
            Reply::Single(response) => conn.send_response(&response).await,
            Reply::Stream(stream) => stream_chunks(stream, conn).await,
        }
    }
}

async fn stream_chunks(mut stream: FileStream, conn: &mut IpcConnection) -> Result<(), IpcError> {
    loop {
        let (returned, next) = match tokio::task::spawn_blocking(move || {
            let next = stream.next_chunk();
            (stream, next)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                let e = RouterError::from(e);
                log_failure(&e);
                return conn.send_response(&e.to_response()).await;
            }
        };
        stream = returned;

        match next {
            Ok(Some(chunk)) => {
                let is_last = chunk.is_last;
                conn.send_response(&Response::Chunk(chunk)).await?;
                if is_last {
                    return Ok(());
                }
            }
            // The stream always flags its final chunk, so running dry means
            // it was already finished.
            Ok(None) => return Ok(()),
            Err(e) => {
                let e = RouterError::from(e);
                log_failure(&e);
                return conn.send_response(&e.to_response()).await;
            }
        }
    }
}

fn log_failure(e: &RouterError) {
    if e.status() == StatusCode::InternalError {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected ({}): {}", e.status(), e);
    }
}

/// Shared handle used by connection tasks.
pub type SharedRouter = Arc<RequestRouter>;
