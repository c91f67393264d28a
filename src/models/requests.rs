//! Query parameters accepted by the gateway

use serde::Deserialize;

/// Query for bus stop endpoints (`?geojson`).
///
/// The flag is present-only: `?geojson`, `?geojson=` and `?geojson=1` all
/// request GeoJSON output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusStopQuery {
    #[serde(default)]
    pub geojson: Option<String>,
}

impl BusStopQuery {
    pub fn wants_geojson(&self) -> bool {
        self.geojson.is_some()
    }
}

/// Query for journey departures (`?direction=inbound|outbound`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartureQuery {
    #[serde(default)]
    pub direction: Option<String>,
}

impl DepartureQuery {
    pub fn direction(&self) -> Direction {
        Direction::parse(self.direction.as_deref())
    }
}

/// Direction filter for departures. Unrecognized values mean no filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Towards the centrum
    Inbound,
    Outbound,
    #[default]
    Any,
}

impl Direction {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("inbound") => Direction::Inbound,
            Some("outbound") => Direction::Outbound,
            _ => Direction::Any,
        }
    }
}
