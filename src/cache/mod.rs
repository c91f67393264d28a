//! Cache Module
//!
//! Expiring in-memory storage and the cache-aside fetch orchestration built
//! on top of it.

mod clock;
mod entry;
mod fetcher;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use fetcher::{CacheAsideFetcher, CacheStatus, Fetched};
pub use stats::{CacheStats, HitCounters};
pub use store::ExpiringCache;
