//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint. Every resource response
//! carries an `X-Cache: HIT|MISS` header describing where the data came from.

use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::CacheStatus;
use crate::error::{GatewayError, Result};
use crate::models::convert::filter_departures;
use crate::models::responses::{departures_url, journey_departures_url};
use crate::models::{
    BusStopQuery, BusStopView, BusStopsResponse, DepartureQuery, DeparturesResponse, Direction,
    Feature, FeatureCollection, HealthResponse, StatsResponse, UrlList,
};
use crate::resources::TransitResources;

const BUS_STOPS_FAILED: &str = "Failed to get bus stops from AtB";
const FORECASTS_FAILED: &str = "Failed to get departures from AtB";
const JOURNEYS_FAILED: &str = "Failed to get departures from Entur";

const INVALID_NODE_ID: &str = "Invalid nodeID";
const INVALID_STOP_ID: &str = "Invalid stop ID. Use https://stoppested.entur.org/ to find stop IDs.";
const UNKNOWN_BUS_STOP: &str = "Unknown bus stop";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<TransitResources>,
}

impl AppState {
    pub fn new(resources: TransitResources) -> Self {
        Self {
            resources: Arc::new(resources),
        }
    }
}

/// Scheme and host the caller used to reach us, e.g. `https://atb.example`.
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy sets it. Without a
/// `Host` header the peer address is used, and `localhost` when that is
/// unknown too.
pub fn url_prefix(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.to_string()))
        .unwrap_or_else(|| "localhost".to_string());
    format!("{scheme}://{host}")
}

/// Extracts the [`url_prefix`] of the current request.
///
/// The peer address is only available when the server is started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Debug, Clone)]
pub struct UrlPrefix(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UrlPrefix
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(url_prefix(&parts.headers, peer)))
    }
}

fn with_cache_status(status: CacheStatus, body: impl IntoResponse) -> Response {
    ([("x-cache", status.as_str())], body).into_response()
}

fn parse_id(raw: &str, message: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| GatewayError::InvalidRequest(message.to_string()))
}

/// Handler for GET /
pub async fn index_handler(UrlPrefix(prefix): UrlPrefix) -> Json<UrlList> {
    Json(UrlList::index(&prefix))
}

/// Handler for GET /api/v1/busstops
///
/// Lists all bus stops, or a GeoJSON FeatureCollection with `?geojson`.
pub async fn bus_stops_handler(
    State(state): State<AppState>,
    UrlPrefix(prefix): UrlPrefix,
    Query(query): Query<BusStopQuery>,
) -> Result<Response> {
    let fetched = state
        .resources
        .bus_stops()
        .await
        .map_err(GatewayError::fetch(BUS_STOPS_FAILED))?;

    let stops = fetched.value.as_ref();
    let body = if query.wants_geojson() {
        Json(FeatureCollection::new(&prefix, stops)).into_response()
    } else {
        Json(BusStopsResponse::new(&prefix, stops)).into_response()
    };

    Ok(with_cache_status(fetched.status, body))
}

/// Handler for GET /api/v1/busstops/:node_id
pub async fn bus_stop_handler(
    State(state): State<AppState>,
    UrlPrefix(prefix): UrlPrefix,
    Path(node_id): Path<String>,
    Query(query): Query<BusStopQuery>,
) -> Result<Response> {
    let node_id = parse_id(&node_id, INVALID_NODE_ID)?;
    let fetched = state
        .resources
        .bus_stops()
        .await
        .map_err(GatewayError::fetch(BUS_STOPS_FAILED))?;

    let stop = fetched
        .value
        .get(node_id)
        .ok_or_else(|| GatewayError::NotFound(UNKNOWN_BUS_STOP.to_string()))?;

    let view = BusStopView::new(&prefix, stop);
    let body = if query.wants_geojson() {
        Json(Feature::new(view)).into_response()
    } else {
        Json(view).into_response()
    };

    Ok(with_cache_status(fetched.status, body))
}

/// Handler for GET /api/v1/departures
///
/// Lists the departure URL of every known bus stop.
pub async fn departures_index_handler(
    State(state): State<AppState>,
    UrlPrefix(prefix): UrlPrefix,
) -> Result<Response> {
    let fetched = state
        .resources
        .bus_stops()
        .await
        .map_err(GatewayError::fetch(BUS_STOPS_FAILED))?;

    let urls = UrlList::departures(&prefix, &fetched.value);
    Ok(with_cache_status(fetched.status, Json(urls)))
}

/// Handler for GET /api/v1/departures/:node_id
///
/// Real-time forecast from AtB. The stop must be known; `X-Cache` reflects
/// the forecast lookup, not the bus stop lookup.
pub async fn departures_handler(
    State(state): State<AppState>,
    UrlPrefix(prefix): UrlPrefix,
    Path(node_id): Path<String>,
) -> Result<Response> {
    let node_id = parse_id(&node_id, INVALID_NODE_ID)?;
    let stops = state
        .resources
        .bus_stops()
        .await
        .map_err(GatewayError::fetch(BUS_STOPS_FAILED))?;

    if stops.value.get(node_id).is_none() {
        return Err(GatewayError::NotFound(UNKNOWN_BUS_STOP.to_string()));
    }

    let fetched = state
        .resources
        .forecast_departures(node_id)
        .await
        .map_err(GatewayError::fetch(FORECASTS_FAILED))?;

    let body = DeparturesResponse::new(
        departures_url(&prefix, node_id),
        Cow::Borrowed(fetched.value.as_ref()),
    );
    Ok(with_cache_status(fetched.status, Json(body)))
}

/// Handler for GET /api/v2/departures/:stop_id
///
/// Upcoming departures from Entur, optionally filtered with
/// `?direction=inbound|outbound`. The cached list is never filtered in place.
pub async fn journey_departures_handler(
    State(state): State<AppState>,
    UrlPrefix(prefix): UrlPrefix,
    Path(stop_id): Path<String>,
    Query(query): Query<DepartureQuery>,
) -> Result<Response> {
    let stop_id = parse_id(&stop_id, INVALID_STOP_ID)?;
    let fetched = state
        .resources
        .journey_departures(stop_id)
        .await
        .map_err(GatewayError::fetch(JOURNEYS_FAILED))?;

    let departures = match query.direction() {
        Direction::Any => Cow::Borrowed(fetched.value.as_ref()),
        direction => Cow::Owned(filter_departures(&fetched.value, direction)),
    };

    let body = DeparturesResponse::new(
        journey_departures_url(&prefix, stop_id),
        departures,
    );
    Ok(with_cache_status(fetched.status, Json(body)))
}

/// Handler for GET /api/v1/busstops/ and /api/v1/departures/
///
/// The path names a single stop but carries no node ID.
pub async fn missing_node_id_handler() -> GatewayError {
    GatewayError::InvalidRequest(INVALID_NODE_ID.to_string())
}

/// Handler for GET /api/v2/departures and /api/v2/departures/
pub async fn missing_stop_id_handler() -> GatewayError {
    GatewayError::InvalidRequest(INVALID_STOP_ID.to_string())
}

/// Handler for GET /stats
///
/// Returns hit/miss statistics per resource kind.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.resources.stats().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> GatewayError {
    GatewayError::NotFound("Resource not found".to_string())
}
