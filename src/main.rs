//! Transit Gateway - A caching gateway in front of the AtB and Entur APIs
//!
//! Serves bus stops and departures from per-resource expiring caches,
//! refreshing them from the upstream transit services on demand.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transit_gateway::upstream::{AtbClient, EnturClient};
use transit_gateway::{
    create_router, AppState, Config, Providers, ResourceSettings, TransitResources,
};

/// Main entry point for the transit gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the upstream clients and the cached resources
/// 4. Start one background sweep task per cache
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM stop accepting requests, then stop the sweepers
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transit_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Transit Gateway");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        stops_ttl = config.stops_ttl,
        departures_ttl = config.departures_ttl,
        sweep_interval = config.sweep_interval,
        coalesce_misses = config.coalesce_misses,
        cors = config.cors,
        "Configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout())
        .build()
        .context("failed to build HTTP client")?;
    let atb = AtbClient::new(
        http.clone(),
        config.atb_url.clone(),
        config.atb_username.clone(),
        config.atb_password.clone(),
    );
    let entur = EnturClient::new(http, config.entur_url.clone());

    let resources = TransitResources::new(
        Providers::from_clients(atb, entur),
        ResourceSettings::from_config(&config),
    );
    let sweepers = resources.spawn_sweepers(config.sweep_interval());
    info!(count = sweepers.len(), "Background sweep tasks started");

    let app = create_router(AppState::new(resources), config.cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    for sweeper in sweepers {
        let resource = sweeper.resource();
        sweeper.shutdown().await;
        info!(resource, "Sweep task stopped");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
