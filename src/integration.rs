//! Host-facing setup and teardown
//!
//! Wires one configured location together: client, coordinator and sensor.
//! Setup only succeeds if the very first fetch does; later failures are
//! absorbed by the coordinator.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info};

use crate::config::{Config, ConfigError};
use crate::data::{VisitClient, VisitSource};
use crate::refresh::{Coordinator, CoordinatorHandle, ListenerHandle, UpdateFailed};
use crate::sensor::{Sensor, SensorState};

/// Errors that prevent a location from being set up
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The first refresh failed; the host should retry setup later
    #[error("Not ready: {0}")]
    NotReady(#[source] UpdateFailed),
}

struct SensorSlot {
    sensor: Sensor,
    state: SensorState,
}

/// A running, configured location
pub struct Integration {
    entry_id: String,
    coordinator: CoordinatorHandle,
    sensor: Arc<Mutex<SensorSlot>>,
    _listener: ListenerHandle,
}

impl Integration {
    /// Validates `config`, performs the first refresh and starts polling
    pub async fn setup(entry_id: impl Into<String>, config: Config) -> Result<Self, SetupError> {
        let client = VisitClient::new(&config)?;
        Self::setup_with_source(entry_id, &config, client).await
    }

    /// Same as [`Integration::setup`] with a caller-supplied source
    pub async fn setup_with_source<S>(
        entry_id: impl Into<String>,
        config: &Config,
        source: S,
    ) -> Result<Self, SetupError>
    where
        S: VisitSource + 'static,
    {
        let entry_id = entry_id.into();
        config.validate()?;

        let mut coordinator =
            Coordinator::new(source, config.coordinates(), config.update_interval)?;
        if let Err(err) = coordinator.first_refresh().await {
            error!(entry_id = %entry_id, error = %err, "Error fetching initial data");
            return Err(SetupError::NotReady(err));
        }

        let mut sensor = Sensor::new(entry_id.clone());
        let state = sensor.update(&coordinator.snapshot());
        let slot = Arc::new(Mutex::new(SensorSlot { sensor, state }));

        let listener_slot = Arc::clone(&slot);
        let listener = coordinator.subscribe(move |status| {
            let mut slot = lock(&listener_slot);
            let state = slot.sensor.update(status);
            debug!(unique_id = %state.unique_id, available = state.available, "Writing sensor state");
            slot.state = state;
        });

        info!(entry_id = %entry_id, "Ice cream sensor set up");
        Ok(Self {
            entry_id,
            coordinator: coordinator.spawn(),
            sensor: slot,
            _listener: listener,
        })
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    /// Latest projected sensor state
    pub fn sensor_state(&self) -> SensorState {
        lock(&self.sensor).state.clone()
    }

    /// Stops polling; no further fetches are issued
    pub async fn unload(self) -> Result<(), JoinError> {
        info!(entry_id = %self.entry_id, "Unloading ice cream sensor");
        self.coordinator.shutdown().await
    }
}

fn lock(slot: &Mutex<SensorSlot>) -> MutexGuard<'_, SensorSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
