//! Next-visit sensor
//!
//! Projects a [`PollStatus`] into what the host displays: a timestamp state,
//! a handful of attributes and an availability flag.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::Region;
use crate::refresh::PollStatus;

/// Value used for attributes the provider did not send
pub const UNKNOWN: &str = "unknown";

pub const ICON: &str = "mdi:ice-cream";

pub const DEVICE_CLASS: &str = "timestamp";

/// Everything the host needs to render the sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub name: String,
    pub unique_id: String,
    pub icon: &'static str,
    pub device_class: &'static str,
    pub available: bool,
    /// Raw estimated arrival of the next visit
    pub state: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

/// Sensor for the next visit at one configured location
///
/// The name and unique id follow the first region seen and never change
/// afterwards.
#[derive(Debug, Clone)]
pub struct Sensor {
    entry_id: String,
    region: Option<Region>,
}

impl Sensor {
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            region: None,
        }
    }

    /// Region the sensor identity is bound to, if known yet
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn name(&self) -> String {
        match self.region {
            Some(region) => format!("Next {} visit", region.brand()),
            None => "Next ice cream visit".to_string(),
        }
    }

    pub fn unique_id(&self) -> String {
        let prefix = match self.region {
            Some(Region::Norway) => "frost",
            Some(Region::Denmark) => "hjemis",
            None => "icecream",
        };
        format!("{}_next_visit_{}", prefix, self.entry_id)
    }

    /// Projects the status into a sensor state, binding the identity on first data
    pub fn update(&mut self, status: &PollStatus) -> SensorState {
        if self.region.is_none() {
            self.region = status.data.as_ref().map(|data| data.region);
        }

        SensorState {
            name: self.name(),
            unique_id: self.unique_id(),
            icon: ICON,
            device_class: DEVICE_CLASS,
            available: status.last_update_success,
            state: next_visit_time(status),
            attributes: attributes(status),
        }
    }
}

/// Estimated arrival of the first visit, if any
pub fn next_visit_time(status: &PollStatus) -> Option<String> {
    status
        .data
        .as_ref()?
        .next_visit()?
        .estimated_arrival
        .clone()
}

/// Display attributes; empty until data has been fetched
pub fn attributes(status: &PollStatus) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let Some(data) = status.data.as_ref() else {
        return attributes;
    };

    if let Some(event) = data.next_visit() {
        attributes.insert(
            "address".to_string(),
            event.address.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        );
        attributes.insert(
            "distance".to_string(),
            event.distance.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        );
    }
    attributes.insert("region".to_string(), data.region.to_string());
    attributes.insert("brand".to_string(), data.region.brand().to_string());
    attributes
}
