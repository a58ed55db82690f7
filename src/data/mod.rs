//! Core data models for the ice cream truck sensor
//!
//! This module contains the types produced by the API client and cached by
//! the coordinator: coordinates, the region they fall in, and the upcoming
//! visits reported by the provider.

pub mod client;

pub use client::{parse_body, FailureKind, FetchError, VisitClient, VisitSource};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Latitude above which a location is treated as Norwegian
///
/// A plain threshold is good enough to tell the two supported countries
/// apart; it is not a geofence.
pub const NORWAY_LATITUDE_THRESHOLD: f64 = 57.9;

/// A configured home location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Region the coordinates fall in
    pub fn region(&self) -> Region {
        Region::from_latitude(self.latitude)
    }
}

/// Supported countries, each served by its own endpoint and brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Denmark,
    Norway,
}

impl Region {
    /// Norway strictly above the threshold, Denmark otherwise
    pub fn from_latitude(latitude: f64) -> Self {
        if latitude > NORWAY_LATITUDE_THRESHOLD {
            Region::Norway
        } else {
            Region::Denmark
        }
    }

    /// Product name shown to the user
    pub fn brand(&self) -> &'static str {
        match self {
            Region::Denmark => "HjemIS",
            Region::Norway => "Fråst",
        }
    }

    /// Country name as displayed in sensor attributes
    pub fn name(&self) -> &'static str {
        match self {
            Region::Denmark => "Denmark",
            Region::Norway => "Norway",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One upcoming visit from the provider's response
///
/// Missing or unusable fields are `None`; defaults are substituted here at
/// parse time so readers never deal with raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    /// Estimated arrival time as sent by the provider (`google_estimate_time`)
    pub estimated_arrival: Option<String>,
    /// Street address of the stop
    pub address: Option<String>,
    /// Distance from the configured location, as text
    pub distance: Option<String>,
}

impl VisitEvent {
    /// Builds an event from one element of the response list
    ///
    /// Anything that is not an object yields an event with no fields.
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(object) => Self {
                estimated_arrival: text_field(object, "google_estimate_time"),
                address: text_field(object, "address"),
                distance: text_field(object, "distance"),
            },
            None => Self::default(),
        }
    }

    /// Estimated arrival parsed as RFC 3339, if present and well formed
    pub fn arrival_time(&self) -> Option<DateTime<FixedOffset>> {
        self.estimated_arrival
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }
}

/// Strings are taken as-is, numbers and booleans are rendered, anything else is absent
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Result of one successful fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Upcoming visits, empty when none are known
    pub events: Vec<VisitEvent>,
    /// Region the request was made for
    pub region: Region,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn new(events: Vec<VisitEvent>, region: Region) -> Self {
        Self {
            events,
            region,
            fetched_at: Utc::now(),
        }
    }

    /// The first (next) visit, if any
    pub fn next_visit(&self) -> Option<&VisitEvent> {
        self.events.first()
    }
}
