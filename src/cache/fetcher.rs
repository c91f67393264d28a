//! Cache-Aside Fetcher Module
//!
//! Read-through orchestration for one kind of cached resource: check the
//! cache, on a miss call upstream, convert, populate, and report whether the
//! value came from cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ExpiringCache, HitCounters};
use crate::error::{ConversionError, FetchError, UpstreamError};

// == Cache Status ==
/// Whether a fetch was answered from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn is_hit(self) -> bool {
        self == CacheStatus::Hit
    }

    /// Value for the `X-Cache` response header.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A fetched value and where it came from.
#[derive(Debug, Clone)]
pub struct Fetched<V> {
    pub value: V,
    pub status: CacheStatus,
}

// == Cache-Aside Fetcher ==
/// Read-through access to one resource kind.
///
/// By default concurrent misses on the same key each call upstream and the
/// last `set` wins. [`with_coalescing`](Self::with_coalescing) serializes
/// misses per key so that waiters are served from the entry the first caller
/// stored.
#[derive(Debug)]
pub struct CacheAsideFetcher<V> {
    /// Resource name used in logs and stats
    resource: &'static str,
    cache: ExpiringCache<V>,
    counters: HitCounters,
    in_flight: Option<InFlight>,
}

impl<V> CacheAsideFetcher<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new(resource: &'static str, cache: ExpiringCache<V>) -> Self {
        Self {
            resource,
            cache,
            counters: HitCounters::new(),
            in_flight: None,
        }
    }

    /// Enables per-key coalescing of concurrent misses.
    pub fn with_coalescing(mut self) -> Self {
        self.in_flight = Some(InFlight::default());
        self
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn cache(&self) -> &ExpiringCache<V> {
        &self.cache
    }

    // == Fetch ==
    /// Returns the cached value for `key`, or loads it through `upstream` and
    /// `convert` and caches it for `ttl`.
    ///
    /// Upstream and conversion failures are returned as-is and leave the
    /// cache untouched. No lock is held while `upstream` runs.
    pub async fn fetch<R, U, Fut, C>(
        &self,
        key: &str,
        ttl: Duration,
        upstream: U,
        convert: C,
    ) -> Result<Fetched<V>, FetchError>
    where
        U: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, UpstreamError>>,
        C: FnOnce(R) -> Result<V, ConversionError>,
    {
        if let Some(value) = self.cache.get(key).await {
            return Ok(self.hit(key, value));
        }

        let _flight = match &self.in_flight {
            Some(in_flight) => {
                let flight = in_flight.acquire(key).await;
                // Another caller may have populated the entry while we waited
                if let Some(value) = self.cache.get(key).await {
                    return Ok(self.hit(key, value));
                }
                Some(flight)
            }
            None => None,
        };

        self.counters.record_miss();
        debug!(resource = self.resource, key = %key, "cache miss, calling upstream");

        let raw = upstream().await.map_err(|err| {
            warn!(resource = self.resource, key = %key, error = %err, "upstream call failed");
            FetchError::Upstream(err)
        })?;

        let value = convert(raw).map_err(|err| {
            warn!(resource = self.resource, key = %key, error = %err, "upstream payload rejected");
            FetchError::Conversion(err)
        })?;

        self.cache.set(key, value.clone(), ttl).await;
        info!(
            resource = self.resource,
            key = %key,
            ttl_secs = ttl.as_secs(),
            "cache populated"
        );

        Ok(Fetched {
            value,
            status: CacheStatus::Miss,
        })
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.cache.len().await)
    }

    fn hit(&self, key: &str, value: V) -> Fetched<V> {
        self.counters.record_hit();
        debug!(resource = self.resource, key = %key, "cache hit");
        Fetched {
            value,
            status: CacheStatus::Hit,
        }
    }
}

// == In-Flight Tracking ==
/// Per-key async locks held while a miss is being loaded.
#[derive(Debug, Default)]
struct InFlight {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        FlightGuard {
            key: key.to_string(),
            in_flight: self,
            _guard: guard,
        }
    }
}

/// Holds the per-key lock; removes the lock from the map when nobody waits on it.
struct FlightGuard<'a> {
    key: String,
    in_flight: &'a InFlight,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .in_flight
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in our own guard
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(&self.key);
        }
    }
}
