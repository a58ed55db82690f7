//! HjemIS / Fråst next-visit sensor
//!
//! Polls the ice cream truck API for a configured location and exposes the
//! next visit's estimated arrival as a sensor value.

pub mod config;
pub mod data;
pub mod integration;
pub mod refresh;
pub mod sensor;

pub use config::{Config, ConfigError, Endpoints};
pub use data::{Coordinates, FetchError, FetchResult, Region, VisitClient, VisitEvent, VisitSource};
pub use integration::{Integration, SetupError};
pub use refresh::{Coordinator, CoordinatorHandle, PollState, PollStatus, UpdateFailed};
pub use sensor::{Sensor, SensorState};
