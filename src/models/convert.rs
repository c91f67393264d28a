//! Converters from upstream payloads to normalized models
//!
//! Every converter is pure; a failure yields a [`ConversionError`] and the
//! fetcher leaves the cache untouched.

use std::f64::consts::PI;

use chrono::{DateTime, NaiveDateTime};

use crate::error::ConversionError;
use crate::models::requests::Direction;
use crate::models::transit::{BusStop, BusStops, Departure, Departures};
use crate::upstream::{RawBusStop, RawBusStops, RawDeparture, RawForecast, RawForecasts};

const EARTH_RADIUS: f64 = 6_378_137.0;
const COORDINATE_DECIMALS: i32 = 6;

const ATB_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";
const ENTUR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const OUTPUT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

// == Bus Stops ==
pub fn convert_bus_stops(raw: RawBusStops) -> Result<BusStops, ConversionError> {
    let stops = raw
        .stops
        .into_iter()
        .map(convert_bus_stop)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BusStops::new(stops))
}

pub fn convert_bus_stop(raw: RawBusStop) -> Result<BusStop, ConversionError> {
    let node_id = parse_number("codAzNodo", &raw.node_id)?;
    let longitude = parse_number("lon", &raw.longitude)?;
    let (latitude, longitude) = convert_coordinates(raw.latitude, longitude);

    Ok(BusStop {
        stop_id: raw.stop_id,
        node_id,
        description: raw.description,
        longitude: ceil_n(longitude, COORDINATE_DECIMALS),
        latitude: ceil_n(latitude, COORDINATE_DECIMALS),
        mobile_code: raw.mobile_code,
        mobile_name: raw.mobile_name,
    })
}

/// Converts EPSG:3785 metres to EPSG:4326 degrees, returning `(lat, lon)`.
pub fn convert_coordinates(latitude: i64, longitude: i64) -> (f64, f64) {
    let origin_shift = PI * EARTH_RADIUS;

    let lat = latitude as f64 / origin_shift * 180.0;
    let lon = longitude as f64 / origin_shift * 180.0;

    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lat, lon)
}

/// Rounds `f` up to `n` decimals.
pub fn ceil_n(f: f64, n: i32) -> f64 {
    let shift = 10f64.powi(n);
    (f * shift).ceil() / shift
}

// == Forecasts ==
pub fn convert_forecasts(raw: RawForecasts) -> Result<Departures, ConversionError> {
    let towards_centrum = match raw.nodes.first() {
        Some(node) => is_towards_centrum(parse_number("codAzNodo", &node.node_id)?),
        None => false,
    };

    let departures = raw
        .forecasts
        .into_iter()
        .map(convert_forecast)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Departures {
        towards_centrum: Some(towards_centrum),
        departures,
    })
}

fn convert_forecast(raw: RawForecast) -> Result<Departure, ConversionError> {
    Ok(Departure {
        registered_departure_time: Some(convert_time("orario", &raw.registered_departure_time)?),
        scheduled_departure_time: convert_time("orarioSched", &raw.scheduled_departure_time)?,
        is_realtime_data: is_realtime(&raw.station_forecast),
        line_id: raw.line_id,
        destination: raw.destination,
        towards_centrum: None,
    })
}

/// Converts `dd.mm.yyyy HH:MM` to `yyyy-mm-ddTHH:MM:SS.000`.
pub fn convert_time(field: &'static str, src: &str) -> Result<String, ConversionError> {
    NaiveDateTime::parse_from_str(src, ATB_TIME_FORMAT)
        .map(|t| t.format(OUTPUT_TIME_FORMAT).to_string())
        .map_err(|_| invalid_time(field, src))
}

pub fn is_realtime(station_forecast: &str) -> bool {
    station_forecast.eq_ignore_ascii_case("prev")
}

/// Odd thousands in a node ID mean the stop serves traffic towards the centrum.
pub fn is_towards_centrum(node_id: i64) -> bool {
    (node_id / 1000) % 2 == 1
}

// == Journey Departures ==
pub fn convert_departures(raw: Vec<RawDeparture>) -> Result<Departures, ConversionError> {
    let departures = raw
        .into_iter()
        .map(convert_departure)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Departures {
        towards_centrum: None,
        departures,
    })
}

fn convert_departure(raw: RawDeparture) -> Result<Departure, ConversionError> {
    let scheduled = convert_offset_time("expectedDepartureTime", &raw.expected_departure_time)?;
    let registered = match raw.actual_departure_time.as_deref() {
        Some(actual) if !actual.is_empty() => {
            Some(convert_offset_time("actualDepartureTime", actual)?)
        }
        _ => None,
    };

    Ok(Departure {
        line_id: raw.line,
        registered_departure_time: registered,
        scheduled_departure_time: scheduled,
        destination: raw.destination,
        is_realtime_data: raw.realtime,
        towards_centrum: Some(raw.direction_type == "inbound"),
    })
}

/// Converts `yyyy-mm-ddTHH:MM:SS+hhmm` to the output format, keeping the
/// wall-clock time of the given offset.
pub fn convert_offset_time(field: &'static str, src: &str) -> Result<String, ConversionError> {
    DateTime::parse_from_str(src, ENTUR_TIME_FORMAT)
        .map(|t| t.format(OUTPUT_TIME_FORMAT).to_string())
        .map_err(|_| invalid_time(field, src))
}

// == Direction Filter ==
/// Returns a copy of `departures` keeping only those heading in `direction`.
/// Departures without a known direction are dropped by a directional filter.
pub fn filter_departures(departures: &Departures, direction: Direction) -> Departures {
    let wanted = match direction {
        Direction::Any => return departures.clone(),
        Direction::Inbound => true,
        Direction::Outbound => false,
    };

    Departures {
        towards_centrum: departures.towards_centrum,
        departures: departures
            .departures
            .iter()
            .filter(|d| d.towards_centrum == Some(wanted))
            .cloned()
            .collect(),
    }
}

// == Helpers ==
fn parse_number(field: &'static str, value: &str) -> Result<i64, ConversionError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConversionError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn invalid_time(field: &'static str, value: &str) -> ConversionError {
    ConversionError::InvalidTime {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::RawNodeInfo;

    fn raw_stop(node_id: &str, longitude: &str) -> RawBusStop {
        RawBusStop {
            stop_id: 100633,
            node_id: node_id.to_string(),
            description: "Prof. Brochs gt".to_string(),
            longitude: longitude.to_string(),
            latitude: 9202874,
            mobile_code: "16011376 (Prof.)".to_string(),
            mobile_name: "Prof. (16011376)".to_string(),
        }
    }

    fn raw_forecast(orario: &str, stato: &str) -> RawForecast {
        RawForecast {
            line_id: "6".to_string(),
            line_description: "6".to_string(),
            registered_departure_time: orario.to_string(),
            scheduled_departure_time: "26.02.2015 18:01".to_string(),
            station_forecast: stato.to_string(),
            destination: "Munkegata M5".to_string(),
        }
    }

    fn raw_departure(direction: &str, actual: Option<&str>) -> RawDeparture {
        RawDeparture {
            line: "21".to_string(),
            expected_departure_time: "2021-08-11T21:19:00+0200".to_string(),
            actual_departure_time: actual.map(str::to_string),
            destination: "Pirbadet via sentrum".to_string(),
            realtime: false,
            direction_type: direction.to_string(),
        }
    }

    #[test]
    fn test_convert_bus_stop() {
        let stop = convert_bus_stop(raw_stop("16011376", "1157514")).unwrap();

        assert_eq!(stop.stop_id, 100633);
        assert_eq!(stop.node_id, 16011376);
        assert!((stop.longitude - 10.398126).abs() < 2e-6);
        assert!((stop.latitude - 63.415535).abs() < 2e-6);
        assert_eq!(stop.mobile_name, "Prof. (16011376)");
    }

    #[test]
    fn test_convert_bus_stop_rejects_non_numeric_node_id() {
        let err = convert_bus_stop(raw_stop("node-1", "1157514")).unwrap_err();
        assert_eq!(
            err,
            ConversionError::InvalidNumber {
                field: "codAzNodo",
                value: "node-1".to_string()
            }
        );
    }

    #[test]
    fn test_convert_bus_stops_fails_as_a_whole() {
        let raw = RawBusStops {
            stops: vec![raw_stop("16011376", "1157514"), raw_stop("1", "east")],
        };
        assert!(matches!(
            convert_bus_stops(raw),
            Err(ConversionError::InvalidNumber { field: "lon", .. })
        ));
    }

    #[test]
    fn test_convert_bus_stops_builds_index() {
        let raw = RawBusStops {
            stops: vec![raw_stop("16011376", "1157514")],
        };
        let stops = convert_bus_stops(raw).unwrap();
        assert_eq!(stops.get(16011376).unwrap().stop_id, 100633);
    }

    #[test]
    fn test_ceil_n() {
        assert_eq!(ceil_n(1.0000001, 6), 1.000001);
        assert_eq!(ceil_n(2.5, 0), 3.0);
    }

    #[test]
    fn test_convert_time() {
        assert_eq!(
            convert_time("orario", "26.02.2015 18:38").unwrap(),
            "2015-02-26T18:38:00.000"
        );
        assert!(matches!(
            convert_time("orario", "2015-02-26 18:38"),
            Err(ConversionError::InvalidTime { field: "orario", .. })
        ));
    }

    #[test]
    fn test_is_realtime() {
        assert!(is_realtime("Prev"));
        assert!(is_realtime("PREV"));
        assert!(!is_realtime("Sched"));
        assert!(!is_realtime(""));
    }

    #[test]
    fn test_is_towards_centrum() {
        assert!(is_towards_centrum(16011376));
        assert!(!is_towards_centrum(16010376));
    }

    #[test]
    fn test_convert_forecasts() {
        let raw = RawForecasts {
            nodes: vec![RawNodeInfo {
                node_id: "16011376".to_string(),
                ..Default::default()
            }],
            forecasts: vec![raw_forecast("26.02.2015 18:38", "Prev")],
            total: 1,
        };
        let departures = convert_forecasts(raw).unwrap();

        assert_eq!(departures.towards_centrum, Some(true));
        let departure = &departures.departures[0];
        assert_eq!(departure.line_id, "6");
        assert_eq!(
            departure.registered_departure_time.as_deref(),
            Some("2015-02-26T18:38:00.000")
        );
        assert_eq!(departure.scheduled_departure_time, "2015-02-26T18:01:00.000");
        assert!(departure.is_realtime_data);
        assert_eq!(departure.towards_centrum, None);
    }

    #[test]
    fn test_convert_forecasts_without_node_info() {
        let raw = RawForecasts {
            nodes: vec![],
            forecasts: vec![],
            total: 0,
        };
        let departures = convert_forecasts(raw).unwrap();
        assert_eq!(departures.towards_centrum, Some(false));
        assert!(departures.departures.is_empty());
    }

    #[test]
    fn test_convert_forecasts_bad_time() {
        let raw = RawForecasts {
            nodes: vec![],
            forecasts: vec![raw_forecast("soon", "Sched")],
            total: 1,
        };
        assert!(matches!(
            convert_forecasts(raw),
            Err(ConversionError::InvalidTime { field: "orario", .. })
        ));
    }

    #[test]
    fn test_convert_departures() {
        let raw = vec![
            raw_departure("outbound", None),
            raw_departure("inbound", Some("2021-08-11T21:20:00+0200")),
        ];
        let departures = convert_departures(raw).unwrap();

        assert_eq!(departures.towards_centrum, None);
        let first = &departures.departures[0];
        assert_eq!(first.line_id, "21");
        assert_eq!(first.scheduled_departure_time, "2021-08-11T21:19:00.000");
        assert_eq!(first.registered_departure_time, None);
        assert_eq!(first.destination, "Pirbadet via sentrum");
        assert_eq!(first.towards_centrum, Some(false));

        let second = &departures.departures[1];
        assert_eq!(
            second.registered_departure_time.as_deref(),
            Some("2021-08-11T21:20:00.000")
        );
        assert_eq!(second.towards_centrum, Some(true));
    }

    #[test]
    fn test_convert_departures_empty_actual_time_is_absent() {
        let departures = convert_departures(vec![raw_departure("inbound", Some(""))]).unwrap();
        assert_eq!(departures.departures[0].registered_departure_time, None);
    }

    #[test]
    fn test_convert_departures_bad_time() {
        let mut raw = raw_departure("inbound", None);
        raw.expected_departure_time = "21:19".to_string();
        assert!(matches!(
            convert_departures(vec![raw]),
            Err(ConversionError::InvalidTime {
                field: "expectedDepartureTime",
                ..
            })
        ));
    }

    #[test]
    fn test_filter_departures() {
        let departures = convert_departures(vec![
            raw_departure("outbound", None),
            raw_departure("inbound", None),
            raw_departure("inbound", None),
        ])
        .unwrap();

        let inbound = filter_departures(&departures, Direction::Inbound);
        let outbound = filter_departures(&departures, Direction::Outbound);
        let any = filter_departures(&departures, Direction::Any);

        assert_eq!(inbound.departures.len(), 2);
        assert_eq!(outbound.departures.len(), 1);
        assert_eq!(any, departures);
        assert_eq!(departures.departures.len(), 3);
    }
}
