//! GeoJSON rendering of bus stops

use serde::Serialize;

use crate::models::responses::BusStopView;
use crate::models::transit::BusStops;

/// A single stop as a GeoJSON `Feature` with a `Point` geometry.
#[derive(Debug, Clone, Serialize)]
pub struct Feature<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: Properties<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct Properties<'a> {
    pub name: &'a str,
    pub busstop: BusStopView<'a>,
}

impl<'a> Feature<'a> {
    pub fn new(view: BusStopView<'a>) -> Self {
        let stop = view.stop;
        Self {
            kind: "Feature",
            geometry: Geometry {
                kind: "Point",
                coordinates: [stop.longitude, stop.latitude],
            },
            properties: Properties {
                name: &stop.description,
                busstop: view,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature<'a>>,
}

impl<'a> FeatureCollection<'a> {
    pub fn new(prefix: &str, stops: &'a BusStops) -> Self {
        Self {
            kind: "FeatureCollection",
            features: stops
                .iter()
                .map(|stop| Feature::new(BusStopView::new(prefix, stop)))
                .collect(),
        }
    }
}
