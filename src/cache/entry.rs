//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with an absolute expiry.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value and the instant after which it is stale.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiry instant, None = TTL too large to represent, never expires
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped at `now` that expires after `ttl`.
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// Boundary condition: an entry is still fresh at exactly its expiry
    /// instant and becomes stale strictly after it.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime as of `now`, or None if it never expires.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}
