//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{http::Method, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    bus_stop_handler, bus_stops_handler, departures_handler, departures_index_handler,
    health_handler, index_handler, journey_departures_handler, missing_node_id_handler,
    missing_stop_id_handler, not_found_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /` - Entry point URLs
/// - `GET /api/v1/busstops` - All bus stops (`?geojson` for GeoJSON)
/// - `GET /api/v1/busstops/:node_id` - One bus stop
/// - `GET /api/v1/departures` - Departure URL of every bus stop
/// - `GET /api/v1/departures/:node_id` - AtB forecast for a bus stop
/// - `GET /api/v2/departures/:stop_id` - Entur departures (`?direction=`)
/// - `GET /api/v1/busstops/`, `/api/v1/departures/`, `/api/v2/departures[/]` -
///   400, the stop ID is missing
/// - `GET /stats` - Per-resource cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: any origin may GET, only when `cors` is set
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(index_handler))
        .route("/api/v1/busstops", get(bus_stops_handler))
        .route("/api/v1/busstops/", get(missing_node_id_handler))
        .route("/api/v1/busstops/:node_id", get(bus_stop_handler))
        .route("/api/v1/departures", get(departures_index_handler))
        .route("/api/v1/departures/", get(missing_node_id_handler))
        .route("/api/v1/departures/:node_id", get(departures_handler))
        .route("/api/v2/departures", get(missing_stop_id_handler))
        .route("/api/v2/departures/", get(missing_stop_id_handler))
        .route("/api/v2/departures/:stop_id", get(journey_departures_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler);

    let router = if cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
    } else {
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
