//! Models for the transit gateway
//!
//! Normalized transit data held by the caches, the converters producing it
//! from upstream payloads, and the DTOs used for HTTP requests and responses.

pub mod convert;
pub mod geojson;
pub mod requests;
pub mod responses;
pub mod transit;

// Re-export commonly used types
pub use geojson::{Feature, FeatureCollection};
pub use requests::{BusStopQuery, DepartureQuery, Direction};
pub use responses::{
    BusStopView, BusStopsResponse, DeparturesResponse, ErrorResponse, HealthResponse,
    StatsResponse, UrlList,
};
pub use transit::{BusStop, BusStops, Departure, Departures};
