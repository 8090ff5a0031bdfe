//! Command Dispatch Module
//!
//! Maps each decoded [`Command`](crate::protocol::Command) to at most one store
//! operation and builds the [`Response`](crate::protocol::Response).
//!
//! ```text
//! ┌───────────────────┐
//! │ RequestParser     │  (protocol module)
//! └─────────┬─────────┘
//!           │ Command
//!           ▼
//! ┌───────────────────┐
//! │ CommandDispatcher │  (this module)
//! └─────────┬─────────┘
//!           │ set / get
//!           ▼
//! ┌───────────────────┐
//! │ StorageEngine     │  (storage module)
//! └───────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`

pub mod dispatcher;

pub use dispatcher::CommandDispatcher;
