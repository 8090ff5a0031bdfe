//! Expiry Timestamps
//!
//! Every stored entry carries an [`Expiry`]: either an absolute deadline on the
//! monotonic clock, or the "never expires" marker. There is no far-future
//! sentinel value; absence of a deadline is its own variant.
//!
//! ## Lazy Expiry
//!
//! Deadlines are only compared against the clock when a key is read.
//! Nothing sweeps the store in the background, so an expired entry keeps
//! occupying memory until the next `SET` on the same key replaces it.
//!
//! ```text
//! SET k v PX 100          GET k (t+50ms)        GET k (t+100ms)
//!   │                        │                      │
//!   ▼                        ▼                      ▼
//! Expiry::At(t+100ms)    now < deadline         now >= deadline
//!                        → value                → nil (entry stays)
//! ```

use std::time::{Duration, Instant};

/// When a stored entry stops being visible to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The entry is valid until it is overwritten.
    #[default]
    Never,
    /// The entry is stale at and after this instant.
    At(Instant),
}

impl Expiry {
    /// Computes the expiry for a `SET` issued at `now`.
    ///
    /// `None` means no `PX` option was given. A TTL too large to be added to
    /// `now` is treated as never expiring.
    pub fn from_ttl_millis(ttl_ms: Option<u64>, now: Instant) -> Self {
        match ttl_ms {
            Some(ms) => now
                .checked_add(Duration::from_millis(ms))
                .map(Expiry::At)
                .unwrap_or(Expiry::Never),
            None => Expiry::Never,
        }
    }

    /// Returns true if the deadline has been reached at `now`.
    ///
    /// A deadline equal to `now` counts as expired, which makes `PX 0`
    /// invisible to every subsequent read.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(deadline) => now >= *deadline,
        }
    }

    /// Checks the deadline against the current time.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}
