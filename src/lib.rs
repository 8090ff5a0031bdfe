//! # EmberKV - A Minimal In-Memory Key-Value Server
//!
//! EmberKV speaks a small subset of the Redis serialization protocol:
//! `PING`, `ECHO`, `SET` (with an optional millisecond TTL) and `GET`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              EmberKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Request    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Parser     │                  │
//! │  └─────────────┘    └──────▲──────┘    └──────┬──────┘                  │
//! │                            │ bytes            │ Command                 │
//! │                     ┌──────┴──────┐    ┌──────▼──────┐                  │
//! │                     │  Response   │<───│  Command    │                  │
//! │                     │  Encoder    │    │  Dispatcher │                  │
//! │                     └─────────────┘    └──────┬──────┘                  │
//! │                                               │ set / get               │
//! │                     ┌─────────────────────────▼────────────────────┐   │
//! │                     │              StorageEngine                   │   │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │                     │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberkv::commands::CommandDispatcher;
//! use emberkv::connection::{handle_connection, ConnectionConfig, ConnectionStats};
//! use emberkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let dispatcher = CommandDispatcher::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             dispatcher,
//!             ConnectionConfig::default(),
//!             stats,
//!         ));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//!
//! Anything else is answered with `-ERR unknown command`.
//!
//! ## Module Overview
//!
//! - [`protocol`]: request parser, command and response types, response encoder
//! - [`storage`]: thread-safe store with lazy TTL expiry
//! - [`commands`]: command dispatcher
//! - [`connection`]: per-client read/dispatch/write loop
//!
//! ## Known Limitations
//!
//! - Only the first command of each read is executed; pipelined commands in
//!   the same packet are dropped.
//! - Expired keys are never swept; they occupy memory until overwritten.
//! - Requests longer than the read buffer (2048 bytes by default) are truncated.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandDispatcher;
pub use connection::{handle_connection, ConnectionConfig, ConnectionStats};
pub use protocol::{parse_request, Command, ParseError, RequestParser, Response};
pub use storage::{Expiry, StorageEngine};

/// The default port EmberKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host EmberKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub use connection::DEFAULT_READ_BUFFER_SIZE;

/// Version of EmberKV, also stored under the bootstrap `version` key
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
