//! Transit Gateway - A caching gateway in front of the AtB and Entur APIs
//!
//! Normalizes bus stops and departures from the upstream transit services and
//! serves them from per-resource expiring caches.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod resources;
pub mod tasks;
pub mod upstream;

pub use api::{create_router, AppState};
pub use config::Config;
pub use resources::{Providers, ResourceSettings, TransitResources};
pub use tasks::{spawn_sweep_task, SweepHandle};
