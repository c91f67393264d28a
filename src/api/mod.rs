//! API Module
//!
//! HTTP handlers and routing for the transit gateway REST API.
//!
//! # Endpoints
//! - `GET /` - Entry point URLs
//! - `GET /api/v1/busstops[/:node_id]` - Bus stops from AtB
//! - `GET /api/v1/departures[/:node_id]` - Forecast departures from AtB
//! - `GET /api/v2/departures/:stop_id` - Departures from Entur
//! - `GET /stats` - Per-resource cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
