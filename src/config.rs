//! Configuration for a single configured location
//!
//! The host supplies the coordinates once at setup; everything else has a
//! default that matches the public HjemIS service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Coordinates, Region};

/// Default endpoint for Danish locations
pub const DENMARK_URL: &str = "https://sms.hjem-is.dk/dk.json";

/// Default endpoint for Norwegian locations
pub const NORWAY_URL: &str = "https://sms.hjem-is.dk/no.json";

/// Contact URL advertised in the User-Agent header unless overridden
pub const DEFAULT_CONTACT_URL: &str = "https://crates.io/crates/hjemis";

/// Default polling interval (1 hour)
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(3600);

/// Default upper bound on a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors raised when validating a [`Config`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Latitude is not a finite value in [-90, 90]
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude is not a finite value in [-180, 180]
    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// The update interval must be non-zero
    #[error("Update interval must be greater than zero")]
    ZeroInterval,
}

/// One URL per supported region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub denmark: String,
    pub norway: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            denmark: DENMARK_URL.to_string(),
            norway: NORWAY_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Returns the URL to query for the given region
    pub fn for_region(&self, region: Region) -> &str {
        match region {
            Region::Denmark => &self.denmark,
            Region::Norway => &self.norway,
        }
    }
}

/// Settings for one configured location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Latitude of the home location
    pub latitude: f64,
    /// Longitude of the home location
    pub longitude: f64,
    /// Time between scheduled refreshes
    #[serde(default = "default_update_interval")]
    pub update_interval: Duration,
    /// Timeout applied to every request
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// API endpoints, overridable for testing or mirrors
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Contact URL advertised in the User-Agent header
    #[serde(default = "default_contact_url")]
    pub contact_url: String,
}

fn default_contact_url() -> String {
    DEFAULT_CONTACT_URL.to_string()
}

fn default_update_interval() -> Duration {
    DEFAULT_UPDATE_INTERVAL
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl Config {
    /// Creates a config for the given coordinates with default settings
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            endpoints: Endpoints::default(),
            contact_url: default_contact_url(),
        }
    }

    /// Overrides the refresh interval
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Overrides the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides both endpoints
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the contact URL sent in the User-Agent header
    pub fn with_contact_url(mut self, url: impl Into<String>) -> Self {
        self.contact_url = url.into();
        self
    }

    /// Checks coordinate ranges and the refresh interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::InvalidLatitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::InvalidLongitude(self.longitude));
        }
        if self.update_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// The configured location
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// User-Agent header value, e.g. `hjemis/0.1.0 (+https://crates.io/crates/hjemis)`
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} (+{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.contact_url
        )
    }
}
