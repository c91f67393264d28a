//! Upstream Providers Module
//!
//! Contracts for the transit data sources behind the gateway, and HTTP
//! clients implementing them.
//!
//! # Providers
//! - AtB: SOAP/XML service wrapping JSON payloads (bus stops, forecasts)
//! - Entur: GraphQL/JSON journey planner (departures)

use async_trait::async_trait;

use crate::error::UpstreamError;

pub mod atb;
pub mod entur;

pub use atb::{AtbClient, RawBusStop, RawBusStops, RawForecast, RawForecasts, RawNodeInfo};
pub use entur::{EnturClient, RawDeparture};

/// Source of the complete bus stop list.
#[async_trait]
pub trait BusStopProvider: Send + Sync {
    async fn bus_stops(&self) -> Result<RawBusStops, UpstreamError>;
}

/// Source of real-time forecasts for a single stop, keyed by node ID.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecasts(&self, node_id: i64) -> Result<RawForecasts, UpstreamError>;
}

/// Source of upcoming departures for a stop place.
#[async_trait]
pub trait JourneyProvider: Send + Sync {
    async fn departures(&self, count: usize, stop_id: i64)
        -> Result<Vec<RawDeparture>, UpstreamError>;
}
