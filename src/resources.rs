//! Transit Resources
//!
//! One cache-aside fetcher per resource kind, each bound to its upstream
//! provider, converter, key scheme and TTL.
//!
//! | Resource  | Key                 | TTL        | Upstream |
//! |-----------|---------------------|------------|----------|
//! | stops     | `"stops"`           | stops      | AtB      |
//! | forecasts | node ID as decimal  | departures | AtB      |
//! | journeys  | stop ID as decimal  | departures | Entur    |

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheAsideFetcher, Clock, ExpiringCache, Fetched, SystemClock};
use crate::config::Config;
use crate::error::FetchError;
use crate::models::convert::{convert_bus_stops, convert_departures, convert_forecasts};
use crate::models::{BusStops, Departures, StatsResponse};
use crate::tasks::SweepHandle;
use crate::upstream::{
    AtbClient, BusStopProvider, EnturClient, ForecastProvider, JourneyProvider,
};

const STOPS_KEY: &str = "stops";

/// Number of departures requested from Entur per stop place.
pub const JOURNEY_DEPARTURE_COUNT: usize = 10;

/// Upstream providers behind the gateway.
#[derive(Clone)]
pub struct Providers {
    pub bus_stops: Arc<dyn BusStopProvider>,
    pub forecasts: Arc<dyn ForecastProvider>,
    pub journeys: Arc<dyn JourneyProvider>,
}

impl Providers {
    /// Wires AtB for stops and forecasts and Entur for journeys.
    pub fn from_clients(atb: AtbClient, entur: EnturClient) -> Self {
        let atb = Arc::new(atb);
        Self {
            bus_stops: atb.clone(),
            forecasts: atb,
            journeys: Arc::new(entur),
        }
    }
}

/// Cache policy for the resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSettings {
    pub stops_ttl: Duration,
    pub departures_ttl: Duration,
    pub coalesce_misses: bool,
}

impl ResourceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stops_ttl: config.stops_ttl(),
            departures_ttl: config.departures_ttl(),
            coalesce_misses: config.coalesce_misses,
        }
    }
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// == Transit Resources ==
pub struct TransitResources {
    providers: Providers,
    settings: ResourceSettings,
    stops: CacheAsideFetcher<Arc<BusStops>>,
    forecasts: CacheAsideFetcher<Arc<Departures>>,
    journeys: CacheAsideFetcher<Arc<Departures>>,
}

impl TransitResources {
    pub fn new(providers: Providers, settings: ResourceSettings) -> Self {
        Self::with_clock(providers, settings, Arc::new(SystemClock))
    }

    /// Creates the resources with all caches reading time from `clock`.
    pub fn with_clock(
        providers: Providers,
        settings: ResourceSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stops: fetcher("stops", &clock, settings.coalesce_misses),
            forecasts: fetcher("forecasts", &clock, settings.coalesce_misses),
            journeys: fetcher("journeys", &clock, settings.coalesce_misses),
            providers,
            settings,
        }
    }

    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    // == Bus Stops ==
    /// All bus stops, indexed by node ID.
    pub async fn bus_stops(&self) -> Result<Fetched<Arc<BusStops>>, FetchError> {
        self.stops
            .fetch(
                STOPS_KEY,
                self.settings.stops_ttl,
                || self.providers.bus_stops.bus_stops(),
                |raw| convert_bus_stops(raw).map(Arc::new),
            )
            .await
    }

    // == Forecasts ==
    /// Real-time forecast departures for the stop with `node_id`.
    pub async fn forecast_departures(
        &self,
        node_id: i64,
    ) -> Result<Fetched<Arc<Departures>>, FetchError> {
        self.forecasts
            .fetch(
                &node_id.to_string(),
                self.settings.departures_ttl,
                || self.providers.forecasts.forecasts(node_id),
                |raw| convert_forecasts(raw).map(Arc::new),
            )
            .await
    }

    // == Journeys ==
    /// Upcoming departures for the stop place with `stop_id`.
    pub async fn journey_departures(
        &self,
        stop_id: i64,
    ) -> Result<Fetched<Arc<Departures>>, FetchError> {
        self.journeys
            .fetch(
                &stop_id.to_string(),
                self.settings.departures_ttl,
                || {
                    self.providers
                        .journeys
                        .departures(JOURNEY_DEPARTURE_COUNT, stop_id)
                },
                |raw| convert_departures(raw).map(Arc::new),
            )
            .await
    }

    // == Stats ==
    pub async fn stats(&self) -> StatsResponse {
        StatsResponse {
            stops: self.stops.stats().await,
            forecasts: self.forecasts.stats().await,
            journeys: self.journeys.stats().await,
        }
    }

    /// Starts one sweep task per cache.
    pub fn spawn_sweepers(&self, interval: Duration) -> Vec<SweepHandle> {
        vec![
            self.stops.cache().spawn_sweeper(self.stops.resource(), interval),
            self.forecasts
                .cache()
                .spawn_sweeper(self.forecasts.resource(), interval),
            self.journeys
                .cache()
                .spawn_sweeper(self.journeys.resource(), interval),
        ]
    }
}

fn fetcher<V>(resource: &'static str, clock: &Arc<dyn Clock>, coalesce: bool) -> CacheAsideFetcher<V>
where
    V: Clone + Send + Sync + 'static,
{
    let fetcher = CacheAsideFetcher::new(resource, ExpiringCache::with_clock(clock.clone()));
    if coalesce {
        fetcher.with_coalescing()
    } else {
        fetcher
    }
}
