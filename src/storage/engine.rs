//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the store shared by every client connection:
//! a sharded `HashMap` from key to [`Entry`], where an entry is a value and
//! its [`Expiry`] stored together.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are hashed onto independent `RwLock`ed shards so
//!    connections touching different keys do not contend.
//! 2. **Whole-Entry Writes**: `set` replaces value and expiry in one insert under
//!    the shard's write lock; a reader never sees one without the other.
//! 3. **Read-Only Gets**: `get` takes only a read lock and clones the entry out.
//!    It never removes anything, even an expired entry.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::storage::expiry::Expiry;
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// Key of the entry every store is created with.
pub const BOOTSTRAP_KEY: &[u8] = b"version";

/// A stored value together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// When this entry stops being visible
    pub expiry: Expiry,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expiry: Expiry::Never,
        }
    }

    /// Creates an entry with the given expiry.
    pub fn with_expiry(value: Bytes, expiry: Expiry) -> Self {
        Self { value, expiry }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }
}

/// Point-in-time counters for the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    /// Physically present keys, expired ones included
    pub keys: u64,
    pub gets: u64,
    pub sets: u64,
}

#[derive(Debug)]
struct Shard {
    data: RwLock<HashMap<Bytes, Entry>>,
}

impl Shard {
    fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    // Entries are replaced or cloned whole, so a writer that panicked
    // cannot have left a torn entry behind a poisoned lock.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The store shared by all client connections.
///
/// # Thread Safety
///
/// Wrap it in an `Arc` and hand a clone to every connection task. `set` and
/// `get` are linearizable per key: each runs entirely under one shard lock.
/// Concurrent `set`s on the same key race, and the last one to take the
/// write lock wins.
///
/// # Example
///
/// ```
/// use emberkv::storage::{Expiry, StorageEngine};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("Ariz"), Expiry::Never);
///
/// let entry = engine.get(b"name").unwrap();
/// assert_eq!(entry.value, Bytes::from("Ariz"));
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,
    key_count: AtomicU64,
    get_count: AtomicU64,
    set_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a store holding only the bootstrap `version` entry.
    pub fn new() -> Self {
        let engine = Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::new()).collect(),
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
        };

        engine.get_shard(BOOTSTRAP_KEY).write().insert(
            Bytes::from_static(BOOTSTRAP_KEY),
            Entry::new(Bytes::from_static(crate::VERSION.as_bytes())),
        );
        engine.key_count.store(1, Ordering::Relaxed);

        engine
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Inserts or fully replaces the entry for `key`.
    ///
    /// The previous value and expiry are discarded; nothing carries over.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was replaced.
    pub fn set(&self, key: Bytes, value: Bytes, expiry: Expiry) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let is_new = self
            .get_shard(&key)
            .write()
            .insert(key, Entry::with_expiry(value, expiry))
            .is_none();

        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }

        is_new
    }

    /// Returns a snapshot of the entry for `key`, or `None` if it was never set.
    ///
    /// Expired entries are returned as-is; deciding visibility is up to the
    /// caller. The map is not modified.
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.get_shard(key).read().get(key).cloned()
    }

    /// Returns the number of physically stored keys, expired ones included.
    pub fn len(&self) -> usize {
        self.key_count.load(Ordering::Relaxed) as usize
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            gets: self.get_count.load(Ordering::Relaxed),
            sets: self.set_count.load(Ordering::Relaxed),
        }
    }
}
