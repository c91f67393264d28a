//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ExpiringCache;

/// Shortest interval a sweep task runs at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// == Sweep Handle ==
/// Owns a running sweep task.
///
/// Call [`shutdown`](SweepHandle::shutdown) to stop the task and wait for it.
/// Dropping the handle stops the task as well.
#[derive(Debug)]
pub struct SweepHandle {
    resource: &'static str,
    shutdown_tx: watch::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SweepHandle {
    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signals the task to stop and waits until it has exited.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawns a background task that sweeps `cache` every `interval`.
///
/// Each run takes the cache's write lock for the duration of one pass over
/// the map. Intervals below [`MIN_SWEEP_INTERVAL`] are raised to it. The task
/// stops when the returned handle is shut down or dropped.
///
/// # Example
/// ```ignore
/// let cache: ExpiringCache<String> = ExpiringCache::new();
/// let sweeper = spawn_sweep_task(cache.clone(), "stops", Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.shutdown().await;
/// ```
pub fn spawn_sweep_task<V>(
    cache: ExpiringCache<V>,
    resource: &'static str,
    interval: Duration,
) -> SweepHandle
where
    V: Clone + Send + Sync + 'static,
{
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            resource,
            requested_ms = interval.as_millis() as u64,
            "Sweep interval too short, using the minimum"
        );
    }
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(async move {
        info!(
            resource,
            interval_secs = interval.as_secs(),
            "Starting cache sweep task"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let removed = cache.sweep().await;
                    if removed > 0 {
                        info!(resource, removed, "Cache sweep removed expired entries");
                    } else {
                        debug!(resource, "Cache sweep found no expired entries");
                    }
                }
            }
        }

        info!(resource, "Cache sweep task stopped");
    });

    SweepHandle {
        resource,
        shutdown_tx,
        handle: Some(handle),
    }
}
