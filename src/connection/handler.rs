//! Connection Handler Module
//!
//! This module handles individual client connections to EmberKV.
//! Each client gets its own handler task that runs in a loop,
//! reading a request and sending a response.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  read ≤ read_buffer_size     │
//!    │              │               │
//!    │              ▼               │
//!    │  parse first command         │
//!    │              │               │
//!    │              ▼               │
//!    │  dispatch + encode           │
//!    │              │               │
//!    │              ▼               │
//!    │  write + flush response      │
//!    │              │               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / I/O error / idle timeout
//! ```
//!
//! ## One Command per Read
//!
//! Each read is treated as exactly one request. If a client pipelines several
//! commands into one packet, only the first runs; the remaining bytes are
//! dropped and logged. Requests larger than the read buffer are truncated
//! and rejected as unknown commands.

use crate::commands::CommandDispatcher;
use crate::protocol::{Command, RequestParser, UnknownCommand};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Default number of bytes taken from the socket per read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 2048;

/// Per-connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Maximum bytes read for one request
    pub read_buffer_size: usize,
    /// Close the connection after this long without a request (None = never)
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            idle_timeout: None,
        }
    }
}

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// No request arrived within the idle timeout
    #[error("Idle for more than {0:?}")]
    IdleTimeout(Duration),
}

/// Handles a single client connection.
///
/// Generic over the byte stream so the loop can run over a `TcpStream` or any
/// other `AsyncRead + AsyncWrite` transport.
pub struct ConnectionHandler<S> {
    /// The byte stream for this connection
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for one incoming request
    buffer: BytesMut,

    dispatcher: CommandDispatcher,

    parser: RequestParser,

    config: ConnectionConfig,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The byte stream for this connection
    /// * `addr` - The client's socket address
    /// * `dispatcher` - The command dispatcher bound to the shared store
    /// * `config` - Read buffer size and idle timeout
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        dispatcher: CommandDispatcher,
        config: ConnectionConfig,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(config.read_buffer_size),
            dispatcher,
            parser: RequestParser::new(),
            config,
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads requests and sends responses until the client disconnects,
    /// an I/O error occurs, or the idle timeout elapses.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    info!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.read_request().await?;

            let command = self.parse_command();
            trace!(client = %self.addr, command = command.name(), "Executing command");
            let response = self.dispatcher.execute(command);
            self.stats.command_processed();

            self.send_response(&response.serialize()).await?;
        }
    }

    /// Decodes the first command in the buffer.
    fn parse_command(&self) -> Command {
        match self.parser.try_parse(&self.buffer) {
            Ok((command, consumed)) => {
                if consumed < self.buffer.len() {
                    debug!(
                        client = %self.addr,
                        dropped = self.buffer.len() - consumed,
                        "Ignoring bytes after the first command"
                    );
                }
                command
            }
            Err(e) => {
                debug!(client = %self.addr, reason = %e, "Rejected request");
                Command::Error(UnknownCommand::from(e))
            }
        }
    }

    /// Replaces the buffer contents with one read from the stream.
    async fn read_request(&mut self) -> Result<(), ConnectionError> {
        self.buffer.clear();
        self.buffer.resize(self.config.read_buffer_size, 0);

        let read = self.stream.get_mut().read(&mut self.buffer[..]);
        let n = match self.config.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| ConnectionError::IdleTimeout(limit))??,
            None => read.await?,
        };
        self.buffer.truncate(n);

        if n == 0 {
            return Err(ConnectionError::ClientDisconnected);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read request");

        Ok(())
    }

    /// Sends an encoded response to the client.
    async fn send_response(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors end only this connection.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    dispatcher: CommandDispatcher,
    config: ConnectionConfig,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, dispatcher, config, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame_request;
    use crate::storage::StorageEngine;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_test::io::Builder;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn mock_handler(
        stream: tokio_test::io::Mock,
        config: ConnectionConfig,
    ) -> (ConnectionHandler<tokio_test::io::Mock>, Arc<ConnectionStats>) {
        let dispatcher = CommandDispatcher::new(Arc::new(StorageEngine::new()));
        let stats = Arc::new(ConnectionStats::new());
        let handler =
            ConnectionHandler::new(stream, test_addr(), dispatcher, config, Arc::clone(&stats));
        (handler, stats)
    }

    async fn create_test_server() -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());
        let stats = Arc::new(ConnectionStats::new());

        let storage_clone = Arc::clone(&storage);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let dispatcher = CommandDispatcher::new(Arc::clone(&storage_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    dispatcher,
                    ConnectionConfig::default(),
                    stats,
                ));
            }
        });

        (addr, storage, stats)
    }

    async fn request(client: &mut TcpStream, bytes: &[u8]) -> Vec<u8> {
        client.write_all(bytes).await.unwrap();
        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();
        let (handler, stats) = mock_handler(stream, ConnectionConfig::default());

        let result = handler.run().await;
        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_session() {
        let stream = Builder::new()
            .read(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n")
            .write(b"+OK\r\n")
            .read(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .write(b"+v\r\n")
            .read(b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$1\r\n0\r\n")
            .write(b"+OK\r\n")
            .read(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .write(b"$-1\r\n")
            .build();
        let (handler, stats) = mock_handler(stream, ConnectionConfig::default());

        assert!(handler.run().await.is_err());
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_connection_open() {
        let stream = Builder::new()
            .read(b"*1\r\n$3\r\nFOO\r\n")
            .write(b"-ERR unknown command\r\n")
            .read(b"garbage")
            .write(b"-ERR unknown command\r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();
        let (handler, stats) = mock_handler(stream, ConnectionConfig::default());

        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_pipelined_commands_drop_extra() {
        let mut pipelined = frame_request(&[b"ECHO", b"first"]);
        pipelined.extend_from_slice(&frame_request(&[b"ECHO", b"second"]));

        let stream = Builder::new().read(&pipelined).write(b"+first\r\n").build();
        let (handler, stats) = mock_handler(stream, ConnectionConfig::default());

        assert!(handler.run().await.is_err());
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_oversized_request_is_truncated() {
        let value = vec![b'x'; 64];
        let request = frame_request(&[b"ECHO", value.as_slice()]);
        let config = ConnectionConfig {
            read_buffer_size: 16,
            ..Default::default()
        };

        // 85 bytes arrive as six 16-byte-or-less reads, none of them parseable.
        assert_eq!(request.len(), 85);
        let mut builder = Builder::new();
        builder.read(&request);
        for _ in 0..6 {
            builder.write(b"-ERR unknown command\r\n");
        }
        let (handler, stats) = mock_handler(builder.build(), config);

        assert!(handler.run().await.is_err());
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 6);
    }

    #[tokio::test]
    async fn test_read_error_ends_connection() {
        let stream = Builder::new()
            .read_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "boom",
            ))
            .build();
        let (handler, stats) = mock_handler(stream, ConnectionConfig::default());

        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::IoError(_))
        ));
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let stream = Builder::new().wait(Duration::from_secs(5)).build();
        let config = ConnectionConfig {
            idle_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let (handler, _) = mock_handler(stream, config);

        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::IdleTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_tcp_set_get() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(
            request(&mut client, b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n").await,
            b"+OK\r\n"
        );
        assert_eq!(
            request(&mut client, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").await,
            b"+Ariz\r\n"
        );
    }

    #[tokio::test]
    async fn test_concurrent_clients_distinct_keys() {
        let (addr, storage, _) = create_test_server().await;

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                tokio::spawn(async move {
                    let mut client = TcpStream::connect(addr).await.unwrap();
                    let key = format!("key{}", i);
                    let value = format!("value{}", i);
                    let set = frame_request(&[b"SET", key.as_bytes(), value.as_bytes()]);
                    assert_eq!(request(&mut client, &set).await, b"+OK\r\n");
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        let mut client = TcpStream::connect(addr).await.unwrap();
        for i in 0..20 {
            let key = format!("key{}", i);
            let get = frame_request(&[b"GET", key.as_bytes()]);
            let expected = format!("+value{}\r\n", i);
            assert_eq!(request(&mut client, &get).await, expected.as_bytes());
        }
        assert_eq!(storage.len(), 21);
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        assert_eq!(request(&mut client, b"*1\r\n$4\r\nPING\r\n").await, b"+PONG\r\n");

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 14);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);

        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
