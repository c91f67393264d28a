//! Normalized transit data
//!
//! These are the values the caches hold. They never carry caller-specific
//! URLs; those are attached by the response layer.

use std::collections::HashMap;

use serde::Serialize;

// == Bus Stops ==
/// A bus stop with WGS84 coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStop {
    pub stop_id: i64,
    pub node_id: i64,
    pub description: String,
    pub longitude: f64,
    pub latitude: f64,
    pub mobile_code: String,
    pub mobile_name: String,
}

/// All known bus stops, indexed by node ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusStops {
    stops: Vec<BusStop>,
    by_node_id: HashMap<i64, usize>,
}

impl BusStops {
    /// Builds the list and its node ID index. On duplicate node IDs the
    /// later stop wins the index slot.
    pub fn new(stops: Vec<BusStop>) -> Self {
        let by_node_id = stops
            .iter()
            .enumerate()
            .map(|(i, stop)| (stop.node_id, i))
            .collect();
        Self { stops, by_node_id }
    }

    /// Looks up a stop by node ID. The returned reference points into the list.
    pub fn get(&self, node_id: i64) -> Option<&BusStop> {
        self.by_node_id.get(&node_id).map(|&i| &self.stops[i])
    }

    pub fn stops(&self) -> &[BusStop] {
        &self.stops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BusStop> {
        self.stops.iter()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Number of distinct node IDs in the index.
    pub fn index_len(&self) -> usize {
        self.by_node_id.len()
    }
}

// == Departures ==
/// A single departure in a given direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    #[serde(rename = "line")]
    pub line_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_departure_time: Option<String>,
    pub scheduled_departure_time: String,
    pub destination: String,
    pub is_realtime_data: bool,
    #[serde(
        rename = "isGoingTowardsCentrum",
        skip_serializing_if = "Option::is_none"
    )]
    pub towards_centrum: Option<bool>,
}

/// Departures from one stop.
///
/// Forecast departures carry the direction on the list; journey departures
/// carry it on every departure instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Departures {
    #[serde(
        rename = "isGoingTowardsCentrum",
        skip_serializing_if = "Option::is_none"
    )]
    pub towards_centrum: Option<bool>,
    pub departures: Vec<Departure>,
}
