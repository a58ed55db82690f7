//! HjemIS / Fråst API client
//!
//! Picks the endpoint for the configured region, issues one GET and turns the
//! body into a [`FetchResult`]. The provider is loose about what it returns:
//! an empty body or `null` means "no visits", anything but a JSON list is an
//! error.

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{Coordinates, FetchResult, VisitEvent};
use crate::config::{Config, Endpoints};

/// Broad category of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    HttpStatus,
    Malformed,
    UnexpectedShape,
}

/// Errors that can occur when fetching visit data
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout, DNS or body transfer failure
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with something other than 200
    #[error("API returned status {0}")]
    HttpStatus(u16),

    /// The body is not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Valid JSON, but not a list
    #[error("Expected a JSON list, got {0}")]
    UnexpectedShape(&'static str),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) => FailureKind::Network,
            FetchError::HttpStatus(_) => FailureKind::HttpStatus,
            FetchError::Malformed(_) => FailureKind::Malformed,
            FetchError::UnexpectedShape(_) => FailureKind::UnexpectedShape,
        }
    }
}

/// Anything that can produce visit data for a location
///
/// Implemented by [`VisitClient`]; the coordinator only depends on this trait.
pub trait VisitSource: Send + Sync {
    fn fetch(&self, coordinates: Coordinates) -> BoxFuture<'_, Result<FetchResult, FetchError>>;
}

/// Client for the ice cream truck visit API
#[derive(Debug, Clone)]
pub struct VisitClient {
    client: Client,
    endpoints: Endpoints,
}

impl VisitClient {
    /// Creates a client from the transport settings in `config`
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent())
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(client, config.endpoints.clone()))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Fetches upcoming visits for the given coordinates
    ///
    /// # Returns
    /// * `Ok(FetchResult)` - visits (possibly none) and the region queried
    /// * `Err(FetchError)` - on transport failure, non-200 status or a bad body
    pub async fn fetch_visits(&self, coordinates: Coordinates) -> Result<FetchResult, FetchError> {
        let region = coordinates.region();
        let url = self.endpoints.for_region(region);
        debug!(
            lat = coordinates.latitude,
            lon = coordinates.longitude,
            %region,
            url,
            "Fetching visit data"
        );

        let lat = coordinates.latitude.to_string();
        let lon = coordinates.longitude.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("coordinates[lat]", lat.as_str()),
                ("coordinates[lng]", lon.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let events = parse_body(&body)?;
        debug!(count = events.len(), %region, "Fetched visit data");

        Ok(FetchResult::new(events, region))
    }
}

impl VisitSource for VisitClient {
    fn fetch(&self, coordinates: Coordinates) -> BoxFuture<'_, Result<FetchResult, FetchError>> {
        self.fetch_visits(coordinates).boxed()
    }
}

/// Parses a 200 response body into visit events
///
/// Empty and `null` bodies (any case) are valid and mean no visits.
pub fn parse_body(body: &str) -> Result<Vec<VisitEvent>, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(trimmed)?;
    match value {
        Value::Array(items) => Ok(items.iter().map(VisitEvent::from_value).collect()),
        other => Err(FetchError::UnexpectedShape(json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
