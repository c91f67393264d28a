//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies. Caller-specific
//! URLs are attached here, on the way out.

use std::borrow::Cow;

use axum::http::StatusCode;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::transit::{BusStop, BusStops, Departures};

/// Body of `GET /` and `GET /api/v1/departures`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlList {
    pub urls: Vec<String>,
}

impl UrlList {
    /// Entry points of the API.
    pub fn index(prefix: &str) -> Self {
        Self {
            urls: vec![
                format!("{prefix}/api/v1/busstops"),
                format!("{prefix}/api/v1/departures"),
                format!("{prefix}/api/v2/departures"),
            ],
        }
    }

    /// One forecast URL per known stop, in list order.
    pub fn departures(prefix: &str, stops: &BusStops) -> Self {
        Self {
            urls: stops
                .iter()
                .map(|stop| departures_url(prefix, stop.node_id))
                .collect(),
        }
    }
}

pub fn bus_stop_url(prefix: &str, node_id: i64) -> String {
    format!("{prefix}/api/v1/busstops/{node_id}")
}

pub fn departures_url(prefix: &str, node_id: i64) -> String {
    format!("{prefix}/api/v1/departures/{node_id}")
}

pub fn journey_departures_url(prefix: &str, stop_id: i64) -> String {
    format!("{prefix}/api/v2/departures/{stop_id}")
}

// == Bus Stops ==
/// A cached bus stop together with its URL.
#[derive(Debug, Clone, Serialize)]
pub struct BusStopView<'a> {
    pub url: String,
    #[serde(flatten)]
    pub stop: &'a BusStop,
}

impl<'a> BusStopView<'a> {
    pub fn new(prefix: &str, stop: &'a BusStop) -> Self {
        Self {
            url: bus_stop_url(prefix, stop.node_id),
            stop,
        }
    }
}

/// Body of `GET /api/v1/busstops`.
#[derive(Debug, Clone, Serialize)]
pub struct BusStopsResponse<'a> {
    pub stops: Vec<BusStopView<'a>>,
}

impl<'a> BusStopsResponse<'a> {
    pub fn new(prefix: &str, stops: &'a BusStops) -> Self {
        Self {
            stops: stops.iter().map(|s| BusStopView::new(prefix, s)).collect(),
        }
    }
}

// == Departures ==
/// Departures together with the URL they were requested from.
#[derive(Debug, Clone, Serialize)]
pub struct DeparturesResponse<'a> {
    pub url: String,
    #[serde(flatten)]
    pub departures: Cow<'a, Departures>,
}

impl<'a> DeparturesResponse<'a> {
    pub fn new(url: String, departures: Cow<'a, Departures>) -> Self {
        Self { url, departures }
    }
}

// == Stats ==
/// Body of `GET /stats`, one entry per resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    pub stops: CacheStats,
    pub forecasts: CacheStats,
    pub journeys: CacheStats,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}
