//! Connection Handler Module
//!
//! Serves one client connection: read a request, parse it, dispatch it,
//! write the encoded response, repeat. Connections share nothing but the
//! store, and a failing connection never affects another.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Parse       │───>│ Dispatch    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │         ▲                                     │             │
//! │         │                                     ▼             │
//! │         │                            ┌─────────────┐        │
//! │         └────────────────────────────│ Send resp   │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionConfig, ConnectionError, ConnectionHandler, ConnectionStats,
    DEFAULT_READ_BUFFER_SIZE,
};
