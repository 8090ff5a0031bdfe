//! Command Dispatcher
//!
//! Executes a decoded command against the shared store.
//!
//! | Command | Store access | Response |
//! |---|---|---|
//! | `Ping` | none | `PONG` |
//! | `Echo(m)` | none | `m`, byte for byte |
//! | `Set { key, value, ttl_ms }` | `set` | `OK` |
//! | `Get(key)` | `get` | the value, or nil if absent or expired |
//! | `Error(UnknownCommand)` | none | unknown-command error |

use crate::protocol::{Command, Response};
use crate::storage::{Expiry, StorageEngine};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Dispatches commands to the storage engine.
///
/// Cheap to clone; every connection gets its own handle onto the same store.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    storage: Arc<StorageEngine>,
}

impl CommandDispatcher {
    /// Creates a new dispatcher with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a command and returns the response.
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Ping => Response::pong(),
            Command::Echo(message) => Response::Payload(message),
            Command::Set { key, value, ttl_ms } => self.cmd_set(key, value, ttl_ms),
            Command::Get(key) => self.cmd_get(&key),
            Command::Error(_) => Response::unknown_command(),
        }
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, key: Bytes, value: Bytes, ttl_ms: Option<u64>) -> Response {
        let expiry = Expiry::from_ttl_millis(ttl_ms, Instant::now());
        let created = self.storage.set(key, value, expiry);
        trace!(created, ?ttl_ms, "SET");
        Response::ok()
    }

    /// GET key
    fn cmd_get(&self, key: &[u8]) -> Response {
        let now = Instant::now();
        match self.storage.get(key) {
            Some(entry) if !entry.expiry.is_expired_at(now) => Response::Payload(entry.value),
            _ => Response::Nil,
        }
    }
}
