//! AtB SOAP Client
//!
//! The AtB InfoTransit service speaks SOAP 1.2, but the interesting part of
//! every response is a JSON document embedded as text inside the result
//! element. This client posts the envelope, pulls that text out and decodes it.

use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::UpstreamError;
use crate::upstream::{BusStopProvider, ForecastProvider};

/// Default InfoTransit endpoint.
pub const DEFAULT_ATB_URL: &str = "http://st.atb.no/InfoTransit/userservices.asmx";

const PROVIDER: &str = "AtB";
const SOAP_CONTENT_TYPE: &str = "application/soap+xml";
const BUS_STOPS_RESULT: &str = "GetBusStopsListResult";
const FORECAST_RESULT: &str = "getUserRealTimeForecastByStopResult";

// == Raw Payloads ==
/// Bus stop list as delivered by AtB.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawBusStops {
    #[serde(rename = "Fermate", default)]
    pub stops: Vec<RawBusStop>,
}

/// A single bus stop as delivered by AtB. Coordinates are EPSG:3785 metres.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawBusStop {
    #[serde(rename = "cinFermata")]
    pub stop_id: i64,
    #[serde(rename = "codAzNodo")]
    pub node_id: String,
    #[serde(rename = "descrizione", default)]
    pub description: String,
    #[serde(rename = "lon")]
    pub longitude: String,
    #[serde(rename = "lat")]
    pub latitude: i64,
    #[serde(rename = "codeMobile", default)]
    pub mobile_code: String,
    #[serde(rename = "nomeMobile", default)]
    pub mobile_name: String,
}

/// Real-time forecast for one stop.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawForecasts {
    #[serde(rename = "InfoNodo", default)]
    pub nodes: Vec<RawNodeInfo>,
    #[serde(rename = "Orari", default)]
    pub forecasts: Vec<RawForecast>,
    #[serde(default)]
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawNodeInfo {
    #[serde(rename = "nome_Az")]
    pub name: String,
    #[serde(rename = "codAzNodo")]
    pub node_id: String,
    #[serde(rename = "nomeNodo")]
    pub node_name: String,
    #[serde(rename = "descrNodo")]
    pub node_description: String,
    #[serde(rename = "bitMaskProprieta")]
    pub bit_mask_properties: String,
    #[serde(rename = "codeMobile")]
    pub mobile_code: String,
    #[serde(rename = "coordLon")]
    pub longitude: String,
    #[serde(rename = "coordLat")]
    pub latitude: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawForecast {
    #[serde(rename = "codAzLinea")]
    pub line_id: String,
    #[serde(rename = "descrizioneLinea")]
    pub line_description: String,
    /// `dd.mm.yyyy HH:MM`
    #[serde(rename = "orario")]
    pub registered_departure_time: String,
    /// `dd.mm.yyyy HH:MM`
    #[serde(rename = "orarioSched")]
    pub scheduled_departure_time: String,
    /// `Prev` for real-time data, `Sched` otherwise
    #[serde(rename = "statoPrevisione")]
    pub station_forecast: String,
    #[serde(rename = "capDest")]
    pub destination: String,
}

// == Client ==
/// Client for the AtB InfoTransit SOAP service.
#[derive(Debug, Clone)]
pub struct AtbClient {
    http: Client,
    url: String,
    username: String,
    password: String,
}

impl AtbClient {
    pub fn new(
        http: Client,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Posts a SOAP envelope and returns the text of `result_element`.
    async fn call(&self, envelope: String, result_element: &str) -> Result<String, UpstreamError> {
        debug!(url = %self.url, method = result_element, "AtB SOAP request");

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        extract_result(&body, result_element)
    }

    fn bus_stops_envelope(&self) -> String {
        envelope(&format!(
            r#"<GetBusStopsList xmlns="http://miz.it/infotransit">
      {auth}
    </GetBusStopsList>"#,
            auth = self.auth()
        ))
    }

    fn forecast_envelope(&self, node_id: i64) -> String {
        envelope(&format!(
            r#"<getUserRealTimeForecastByStop xmlns="http://miz.it/infotransit">
      {auth}
      <busStopId>{node_id}</busStopId>
    </getUserRealTimeForecastByStop>"#,
            auth = self.auth()
        ))
    }

    fn auth(&self) -> String {
        format!(
            "<auth><user>{}</user><password>{}</password></auth>",
            escape(self.username.as_str()),
            escape(self.password.as_str())
        )
    }
}

#[async_trait]
impl BusStopProvider for AtbClient {
    async fn bus_stops(&self) -> Result<RawBusStops, UpstreamError> {
        let json = self.call(self.bus_stops_envelope(), BUS_STOPS_RESULT).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[async_trait]
impl ForecastProvider for AtbClient {
    async fn forecasts(&self, node_id: i64) -> Result<RawForecasts, UpstreamError> {
        let json = self
            .call(self.forecast_envelope(node_id), FORECAST_RESULT)
            .await?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap12:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap12="http://www.w3.org/2003/05/soap-envelope">
  <soap12:Body>
    {body}
  </soap12:Body>
</soap12:Envelope>"#
    )
}

/// Returns the unescaped text content of the first `element` in `xml`,
/// matched by local name.
pub fn extract_result(xml: &str, element: &str) -> Result<String, UpstreamError> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == element.as_bytes() => {
                inside = true;
            }
            Ok(Event::Text(t)) if inside => {
                let unescaped = t.unescape().map_err(|err| UpstreamError::Envelope {
                    reason: err.to_string(),
                })?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(c)) if inside => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::End(e)) if inside && e.local_name().as_ref() == element.as_bytes() => {
                return Ok(text.trim().to_string());
            }
            Ok(Event::Eof) => {
                return Err(UpstreamError::Envelope {
                    reason: format!("element {element} not found"),
                });
            }
            Err(err) => {
                return Err(UpstreamError::Envelope {
                    reason: err.to_string(),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUS_STOPS_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap12:Envelope xmlns:soap12="http://www.w3.org/2003/05/soap-envelope">
  <soap12:Body>
    <GetBusStopsListResponse xmlns="http://miz.it/infotransit">
      <GetBusStopsListResult>
{
  "Fermate": [
    {
      "cinAzienda": 1,
      "nomeAzienda": "AtB",
      "cinFermata": 100633,
      "codAzNodo": "16011376",
      "descrizione": "Prof. Brochs gt",
      "lon": "1157514",
      "lat": 9202874,
      "name": "Prof.",
      "codeMobile": "16011376 (Prof.)",
      "nomeMobile": "Prof. (16011376)"
    }
  ]
}
      </GetBusStopsListResult>
    </GetBusStopsListResponse>
  </soap12:Body>
</soap12:Envelope>"#;

    fn client() -> AtbClient {
        AtbClient::new(Client::new(), DEFAULT_ATB_URL, "user", "p<ss")
    }

    #[test]
    fn test_extract_result_and_decode() {
        let json = extract_result(BUS_STOPS_RESPONSE, BUS_STOPS_RESULT).unwrap();
        let stops: RawBusStops = serde_json::from_str(&json).unwrap();

        assert_eq!(
            stops.stops,
            vec![RawBusStop {
                stop_id: 100633,
                node_id: "16011376".to_string(),
                description: "Prof. Brochs gt".to_string(),
                longitude: "1157514".to_string(),
                latitude: 9202874,
                mobile_code: "16011376 (Prof.)".to_string(),
                mobile_name: "Prof. (16011376)".to_string(),
            }]
        );
    }

    #[test]
    fn test_extract_result_unescapes_entities() {
        let xml = "<Envelope><Body><R>{&quot;a&quot;:1}</R></Body></Envelope>";
        assert_eq!(extract_result(xml, "R").unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_result_missing_element() {
        let result = extract_result(BUS_STOPS_RESPONSE, FORECAST_RESULT);
        assert!(matches!(result, Err(UpstreamError::Envelope { .. })));
    }

    #[test]
    fn test_forecast_envelope_contains_node_and_escaped_credentials() {
        let envelope = client().forecast_envelope(16011376);
        assert!(envelope.contains("getUserRealTimeForecastByStop"));
        assert!(envelope.contains("<busStopId>16011376</busStopId>"));
        assert!(envelope.contains("<password>p&lt;ss</password>"));
    }

    #[test]
    fn test_bus_stops_envelope() {
        let envelope = client().bus_stops_envelope();
        assert!(envelope.starts_with("<?xml"));
        assert!(envelope.contains("GetBusStopsList"));
        assert!(envelope.contains("<user>user</user>"));
    }

    #[test]
    fn test_forecasts_decode() {
        let json = r#"{
          "total": 1,
          "timeServer": "2015-02-26 18:37",
          "InfoNodo": [{"nome_Az": "AtB", "codAzNodo": "16011376", "nomeNodo": "Prof."}],
          "Orari": [{
            "codAzLinea": "6",
            "descrizioneLinea": "6",
            "orario": "26.02.2015 18:38",
            "orarioSched": "26.02.2015 18:01",
            "statoPrevisione": "Prev",
            "capDest": "Munkegata M5"
          }]
        }"#;
        let forecasts: RawForecasts = serde_json::from_str(json).unwrap();

        assert_eq!(forecasts.total, 1);
        assert_eq!(forecasts.nodes[0].node_id, "16011376");
        assert_eq!(forecasts.forecasts[0].destination, "Munkegata M5");
        assert_eq!(forecasts.forecasts[0].station_forecast, "Prev");
    }
}
