//! Entur Journey Planner Client
//!
//! Queries the Entur GraphQL API for estimated calls at a stop place and
//! flattens them into [`RawDeparture`] records.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::UpstreamError;
use crate::upstream::JourneyProvider;

/// Default Journey Planner v2 endpoint.
pub const DEFAULT_ENTUR_URL: &str = "https://api.entur.io/journey-planner/v2/graphql";

/// Identifies this client to Entur.
pub const CLIENT_NAME: &str = "transit-gateway";

const PROVIDER: &str = "Entur";
const ESTIMATED_CALL_FIELDS: &str = "realtime expectedDepartureTime actualDepartureTime \
     destinationDisplay{frontText} \
     serviceJourney{journeyPattern{directionType line{publicCode}}}";

// == Raw Payload ==
/// One upcoming departure, still in Entur's vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDeparture {
    /// Public line code, e.g. "21"
    pub line: String,
    /// `yyyy-mm-ddTHH:MM:SS+hhmm`
    pub expected_departure_time: String,
    /// Present once the vehicle has actually left
    pub actual_departure_time: Option<String>,
    pub destination: String,
    pub realtime: bool,
    /// "inbound" or "outbound"
    pub direction_type: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    stop_place: Option<StopPlace>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StopPlace {
    estimated_calls: Vec<EstimatedCall>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EstimatedCall {
    realtime: bool,
    expected_departure_time: String,
    actual_departure_time: Option<String>,
    destination_display: DestinationDisplay,
    service_journey: ServiceJourney,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DestinationDisplay {
    front_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServiceJourney {
    journey_pattern: JourneyPattern,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JourneyPattern {
    direction_type: String,
    line: Line,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Line {
    public_code: String,
}

// == Client ==
/// Client for the Entur Journey Planner GraphQL API.
#[derive(Debug, Clone)]
pub struct EnturClient {
    http: Client,
    url: String,
}

impl EnturClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl JourneyProvider for EnturClient {
    async fn departures(
        &self,
        count: usize,
        stop_id: i64,
    ) -> Result<Vec<RawDeparture>, UpstreamError> {
        debug!(url = %self.url, stop_id, count, "Entur GraphQL request");

        let response = self
            .http
            .post(&self.url)
            .header("ET-Client-Name", CLIENT_NAME)
            .json(&json!({ "query": departures_query(count, stop_id) }))
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
        parse_departures(&body)
    }
}

/// Builds the GraphQL query for the next `count` departures from a stop place.
pub fn departures_query(count: usize, stop_id: i64) -> String {
    format!(
        "{{stopPlace(id:\"NSR:StopPlace:{stop_id}\"){{id name \
         estimatedCalls(numberOfDepartures:{count}){{{ESTIMATED_CALL_FIELDS}}}}}}}"
    )
}

/// Decodes a Journey Planner response into departures.
///
/// An unknown stop place yields no departures; GraphQL errors are failures.
pub fn parse_departures(body: &str) -> Result<Vec<RawDeparture>, UpstreamError> {
    let response: GraphQlResponse = serde_json::from_str(body)?;

    if !response.errors.is_empty() {
        let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(UpstreamError::GraphQl(messages.join("; ")));
    }

    let calls = response
        .data
        .and_then(|data| data.stop_place)
        .map(|stop_place| stop_place.estimated_calls)
        .unwrap_or_default();

    Ok(calls
        .into_iter()
        .map(|call| RawDeparture {
            line: call.service_journey.journey_pattern.line.public_code,
            expected_departure_time: call.expected_departure_time,
            actual_departure_time: call.actual_departure_time,
            destination: call.destination_display.front_text,
            realtime: call.realtime,
            direction_type: call.service_journey.journey_pattern.direction_type,
        })
        .collect())
}
