//! Cache Store Module
//!
//! Generic expiring key-value store shared by every request worker.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::{CacheEntry, Clock, SystemClock};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Expiring Cache ==
/// Concurrency-safe map from string keys to values that expire.
///
/// Cloning is cheap and yields another handle to the same storage. Freshness
/// is checked on every read, so a stale entry is never returned even if the
/// sweep task has not removed it yet.
pub struct ExpiringCache<V> {
    inner: Arc<Inner<V>>,
}

struct Inner<V> {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    /// Source of "now" for stamping and checking expiry
    clock: Arc<dyn Clock>,
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty cache driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                clock,
            }),
        }
    }

    // == Get ==
    /// Returns a copy of the value stored under `key` if it has not expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.inner.entries.read().await;
        let now = self.inner.clock.now();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The entry expires `ttl` after the current clock reading.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut entries = self.inner.entries.write().await;
        let entry = CacheEntry::new(value, self.inner.clock.now(), ttl);
        entries.insert(key.into(), entry);
    }

    // == Sweep ==
    /// Removes all entries that have expired as of the current clock reading.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.inner.entries.write().await;
        let now = self.inner.clock.now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries.
    ///
    /// Expired entries are counted until a sweep removes them.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    // == Sweeper ==
    /// Starts a background task that sweeps this cache every `interval`.
    ///
    /// Must be called from within a tokio runtime. The task stops when the
    /// returned handle is shut down or dropped.
    pub fn spawn_sweeper(&self, resource: &'static str, interval: Duration) -> SweepHandle {
        spawn_sweep_task(self.clone(), resource, interval)
    }
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("clock", &self.inner.clock)
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn manual_cache() -> (ExpiringCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ExpiringCache::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_cache_new() {
        let cache: ExpiringCache<String> = ExpiringCache::new();
        assert_eq!(cache.len().await, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (cache, _) = manual_cache();

        cache
            .set("k1", "v1".to_string(), Duration::from_secs(60))
            .await;

        assert_eq!(cache.get("k1").await, Some("v1".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (cache, _) = manual_cache();
        assert_eq!(cache.get("nonexistent").await, None);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (cache, _) = manual_cache();

        cache.set("k1", "old".to_string(), Duration::from_secs(60)).await;
        cache.set("k1", "new".to_string(), Duration::from_secs(60)).await;

        assert_eq!(cache.get("k1").await, Some("new".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_overwrite_resets_expiry() {
        let (cache, clock) = manual_cache();

        cache.set("k1", "old".to_string(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(50));
        cache.set("k1", "new".to_string(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(50));

        assert_eq!(cache.get("k1").await, Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_get_hides_expired_entry_before_sweep() {
        let (cache, clock) = manual_cache();

        cache.set("k1", "v1".to_string(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(61));

        assert_eq!(cache.get("k1").await, None);
        // Still physically present until swept
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (cache, clock) = manual_cache();

        cache.set("short", "a".to_string(), Duration::from_secs(5)).await;
        cache.set("long", "b".to_string(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("long").await, Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_mixed_offsets() {
        // Entries written at different clock readings, all read at one instant
        let (cache, clock) = manual_cache();

        cache.set("k1", "1".to_string(), Duration::from_secs(60)).await;
        cache.set("k2", "2".to_string(), Duration::from_secs(5)).await;
        clock.advance(Duration::from_secs(6));
        cache.set("k3", "3".to_string(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(55));

        assert_eq!(cache.get("k1").await, None);
        assert_eq!(cache.get("k2").await, None);
        assert_eq!(cache.get("k3").await, Some("3".to_string()));

        assert_eq!(cache.sweep().await, 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let (cache, _) = manual_cache();
        let other = cache.clone();

        cache.set("k1", "v1".to_string(), Duration::from_secs(60)).await;

        assert_eq!(other.get("k1").await, Some("v1".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_disjoint_keys() {
        let cache: ExpiringCache<usize> = ExpiringCache::new();
        let mut handles = Vec::new();

        for worker in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let key = format!("w{worker}-k{i}");
                    cache.set(key.clone(), worker * 1000 + i, Duration::from_secs(60)).await;
                    assert_eq!(cache.get(&key).await, Some(worker * 1000 + i));
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len().await, 16 * 50);
        for worker in 0..16 {
            for i in 0..50 {
                let key = format!("w{worker}-k{i}");
                assert_eq!(cache.get(&key).await, Some(worker * 1000 + i));
            }
        }
    }
}
