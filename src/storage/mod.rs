//! Storage Engine Module
//!
//! The store shared by every connection: a sharded map from key to
//! (value, expiry), with expiry enforced lazily on read.
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Atomic Entries**: value and expiry are written and read as one unit
//! - **Lazy Expiry**: deadlines are compared only when a key is read; nothing
//!   is evicted in the background
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::{Expiry, StorageEngine};
//! use bytes::Bytes;
//! use std::time::Instant;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("name"), Bytes::from("Ariz"), Expiry::Never);
//! assert!(!engine.get(b"name").unwrap().is_expired());
//!
//! let expiry = Expiry::from_ttl_millis(Some(0), Instant::now());
//! engine.set(Bytes::from("session"), Bytes::from("token123"), expiry);
//! assert!(engine.get(b"session").unwrap().is_expired());
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{Entry, StorageEngine, StorageStats, BOOTSTRAP_KEY};
pub use expiry::Expiry;
