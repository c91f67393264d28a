//! Error types for the transit gateway
//!
//! Provides the error taxonomy of the cache-aside pipeline using thiserror,
//! plus the mapping of gateway errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

// == Upstream Error ==
/// Failure while talking to an upstream provider.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    /// SOAP envelope could not be decoded
    #[error("invalid SOAP envelope: {reason}")]
    Envelope { reason: String },

    /// Provider reported errors in a GraphQL response
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Payload was not the JSON document we expected
    #[error("invalid JSON payload: {0}")]
    Payload(#[from] serde_json::Error),
}

// == Conversion Error ==
/// Upstream payload decoded fine but does not fit the normalized schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("field {field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field {field} is not a valid time: {value:?}")]
    InvalidTime { field: &'static str, value: String },
}

// == Fetch Error ==
/// Outcome of a failed cache-aside fetch. Neither variant is ever cached.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

// == Gateway Error ==
/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A fetch failed; `context` is the caller-facing message
    #[error("{context}: {source}")]
    Fetch {
        context: &'static str,
        #[source]
        source: FetchError,
    },

    /// Requested identifier is unknown
    #[error("{0}")]
    NotFound(String),

    /// Malformed caller input
    #[error("{0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Returns a closure wrapping a [`FetchError`] with a caller-facing message.
    pub fn fetch(context: &'static str) -> impl FnOnce(FetchError) -> Self {
        move |source| Self::Fetch { context, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Fetch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            GatewayError::Fetch { context, source } => {
                error!(error = %source, "{}", context);
                (*context).to_string()
            }
            GatewayError::NotFound(msg) | GatewayError::InvalidRequest(msg) => msg.clone(),
        };

        (status, Json(ErrorResponse::new(status, message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handlers.
pub type Result<T> = std::result::Result<T, GatewayError>;
