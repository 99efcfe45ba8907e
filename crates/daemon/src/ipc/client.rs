//! IPC client used by the `shelfd` subcommands to talk to a running daemon.
//!
//! Single-response requests go through [`IpcClient::send`]. Playback reads a
//! run of chunk responses and writes their payload to any async writer.

use std::io;
use std::path::Path;
use std::time::Duration;

use protocol::{
    DeleteOutcome, DeleteRequest, DirectoryEntry, PlayRequest, Request, Response,
};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use super::server::IpcError;

/// Default timeout for client operations in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Totals reported after a completed play delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaySummary {
    /// Size of the whole file on the daemon side.
    pub total_size: u64,
    /// Payload bytes written to the output.
    pub bytes_written: u64,
    /// Number of chunk responses received.
    pub chunks: usize,
}

/// A client for communicating with the daemon via IPC.
pub struct IpcClient {
    reader: BufReader<tokio::io::ReadHalf<UnixStream>>,
    writer: tokio::io::WriteHalf<UnixStream>,
    timeout: Duration,
}

impl IpcClient {
    /// Connect to the daemon at the specified socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    /// This typically indicates that the daemon is not running.
    pub async fn connect(path: &Path) -> Result<Self, IpcError> {
        Self::connect_with_timeout(path, Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
    }

    /// Connect to the daemon with a custom timeout.
    ///
    /// The timeout applies to connecting and to every response read
    /// afterwards, not to a whole play delivery.
    pub async fn connect_with_timeout(path: &Path, timeout: Duration) -> Result<Self, IpcError> {
        let stream = tokio::time::timeout(timeout, UnixStream::connect(path))
            .await
            .map_err(|_| timed_out("connection timed out"))??;

        let (read_half, write_half) = tokio::io::split(stream);

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            timeout,
        })
    }

    /// Send a request and wait for its single response.
    ///
    /// Error responses are returned as-is; the typed helpers below turn them
    /// into [`IpcError::Remote`].
    pub async fn send(&mut self, request: Request) -> Result<Response, IpcError> {
        self.write_request(&request).await?;
        self.read_response().await
    }

    async fn write_request(&mut self, request: &Request) -> Result<(), IpcError> {
        let mut json = serde_json::to_string(request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self) -> Result<Response, IpcError> {
        let mut line = String::new();
        let bytes_read = tokio::time::timeout(self.timeout, self.reader.read_line(&mut line))
            .await
            .map_err(|_| timed_out("operation timed out"))??;

        if bytes_read == 0 {
            return Err(IpcError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "daemon closed connection",
            )));
        }

        Ok(serde_json::from_str(line.trim())?)
    }

    /// Send a ping request to check if the daemon is responsive.
    ///
    /// Returns `true` if the daemon responds with a Pong.
    pub async fn ping(&mut self) -> Result<bool, IpcError> {
        let response = self.send(Request::Ping).await?;
        Ok(matches!(response, Response::Pong))
    }

    /// Get the daemon's root and uptime.
    pub async fn status(&mut self) -> Result<(String, u64), IpcError> {
        match self.send(Request::Status).await? {
            Response::Status { root, uptime_secs } => Ok((root, uptime_secs)),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch the current catalog.
    pub async fn list(&mut self) -> Result<Vec<DirectoryEntry>, IpcError> {
        match self.send(Request::List).await? {
            Response::Entries { entries } => Ok(entries),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the daemon to delete a catalogued file.
    pub async fn delete(&mut self, request: DeleteRequest) -> Result<DeleteOutcome, IpcError> {
        match self.send(Request::Delete(request)).await? {
            Response::Deleted { outcome } => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    /// Stream a file from the daemon into `out`.
    ///
    /// Reads chunk responses until one is marked last. An error response
    /// before that ends the delivery with [`IpcError::Remote`]; bytes already
    /// written stay written.
    pub async fn play<W>(&mut self, request: PlayRequest, out: &mut W) -> Result<PlaySummary, IpcError>
    where
        W: AsyncWrite + Unpin,
    {
        self.write_request(&Request::Play(request)).await?;

        let mut summary = PlaySummary {
            total_size: 0,
            bytes_written: 0,
            chunks: 0,
        };

        loop {
            match self.read_response().await? {
                Response::Chunk(chunk) => {
                    out.write_all(&chunk.data).await?;
                    summary.total_size = chunk.total_size;
                    summary.bytes_written += chunk.data.len() as u64;
                    summary.chunks += 1;
                    if chunk.is_last {
                        break;
                    }
                }
                other => return Err(unexpected(other)),
            }
        }

        out.flush().await?;
        Ok(summary)
    }
}

fn timed_out(message: &str) -> IpcError {
    IpcError::Io(io::Error::new(io::ErrorKind::TimedOut, message.to_string()))
}

fn unexpected(response: Response) -> IpcError {
    match response {
        Response::Error { status, message } => IpcError::Remote { status, message },
        other => IpcError::UnexpectedResponse(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::server::IpcServer;
    use protocol::{Fingerprint, PlayChunk, StatusCode};
    use tempfile::tempdir;

    fn sample_entry() -> DirectoryEntry {
        DirectoryEntry {
            name: "video.mp4".to_string(),
            path: "/downloads/video.mp4".to_string(),
            fingerprint: "ef2240ff7ec24ac66de7dc674e32e1ef5b7e10a675f051dbdc88ba7245434f5a"
                .parse::<Fingerprint>()
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_client_connect_fails_when_daemon_not_running() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("nonexistent.sock");

        let result = IpcClient::connect(&socket_path).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_client_ping() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = IpcServer::bind(&socket_path).await.unwrap();

        let server_handle = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            let request = conn.read_request().await.unwrap().unwrap();
            assert_eq!(request, Request::Ping);
            conn.send_response(&Response::Pong).await.unwrap();
        });

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        assert!(client.ping().await.unwrap());

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_client_list() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = IpcServer::bind(&socket_path).await.unwrap();

        let server_handle = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            let request = conn.read_request().await.unwrap().unwrap();
            assert_eq!(request, Request::List);
            conn.send_response(&Response::Entries {
                entries: vec![sample_entry()],
            })
            .await
            .unwrap();
        });

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        let entries = client.list().await.unwrap();
        assert_eq!(entries, vec![sample_entry()]);

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_client_delete_mismatch_is_not_an_error() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = IpcServer::bind(&socket_path).await.unwrap();

        let server_handle = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            let request = conn.read_request().await.unwrap().unwrap();
            assert!(matches!(request, Request::Delete(_)));
            conn.send_response(&Response::Deleted {
                outcome: DeleteOutcome::Mismatch,
            })
            .await
            .unwrap();
        });

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        let outcome = client
            .delete(DeleteRequest::for_entry(&sample_entry()))
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Mismatch);

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_client_play_writes_all_chunks() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = IpcServer::bind(&socket_path).await.unwrap();

        let server_handle = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            let request = conn.read_request().await.unwrap().unwrap();
            assert!(matches!(request, Request::Play(_)));
            for (offset, data, is_last) in [(0u64, "hello ", false), (6, "world", true)] {
                conn.send_response(&Response::Chunk(PlayChunk {
                    offset,
                    total_size: 11,
                    data: data.as_bytes().to_vec(),
                    is_last,
                }))
                .await
                .unwrap();
            }
        });

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        let mut out = Vec::new();
        let summary = client.play(PlayRequest::new("2f61"), &mut out).await.unwrap();

        assert_eq!(out, b"hello world");
        assert_eq!(
            summary,
            PlaySummary {
                total_size: 11,
                bytes_written: 11,
                chunks: 2,
            }
        );

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_client_play_error_response() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = IpcServer::bind(&socket_path).await.unwrap();

        let server_handle = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            conn.read_request().await.unwrap().unwrap();
            conn.send_response(&Response::error(StatusCode::Unauthorized, "outside root"))
                .await
                .unwrap();
        });

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        let mut out = Vec::new();
        let err = client
            .play(PlayRequest::new("2f6574632f706173737764"), &mut out)
            .await
            .unwrap_err();

        match err {
            IpcError::Remote { status, .. } => assert_eq!(status, StatusCode::Unauthorized),
            other => panic!("Expected Remote error, got {:?}", other),
        }
        assert!(out.is_empty());

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_client_timeout() {
        let temp_dir = tempdir().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = IpcServer::bind(&socket_path).await.unwrap();

        // Server that never responds
        let _server_handle = tokio::spawn(async move {
            let _conn = server.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut client =
            IpcClient::connect_with_timeout(&socket_path, Duration::from_millis(100))
                .await
                .unwrap();

        let result = client.ping().await;
        assert!(result.is_err());
    }
}
