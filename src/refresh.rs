//! Polling coordinator
//!
//! Owns the refresh interval for one configured location, caches the last
//! successful [`FetchResult`] and tells listeners about every completed cycle.
//! A failed cycle keeps the cached data and only clears the success flag, so
//! stale data is preferred over no data.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;
use crate::data::{Coordinates, FetchError, FetchResult, VisitSource};

/// A failed poll cycle, carrying the underlying fetch error
#[derive(Debug, Error)]
#[error("Error updating ice cream data: {0}")]
pub struct UpdateFailed(#[from] pub FetchError);

/// Whether any data has ever been fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    NoData,
    HasData,
}

/// Snapshot of the coordinator after the most recent cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStatus {
    /// Whether the last cycle succeeded
    pub last_update_success: bool,
    /// Last successful result, kept across failed cycles
    pub data: Option<FetchResult>,
    /// When the last successful cycle finished
    pub last_updated: Option<DateTime<Utc>>,
}

impl PollStatus {
    pub fn state(&self) -> PollState {
        if self.data.is_some() {
            PollState::HasData
        } else {
            PollState::NoData
        }
    }
}

type Listener = Arc<dyn Fn(&PollStatus) + Send + Sync>;

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Callbacks invoked at the end of every poll cycle
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Mutex<ListenerSet>>,
}

impl Listeners {
    fn lock(&self) -> MutexGuard<'_, ListenerSet> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a callback; it stays registered until the handle is dropped
    pub fn subscribe<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&PollStatus) + Send + Sync + 'static,
    {
        let mut set = self.lock();
        let id = set.next_id;
        set.next_id += 1;
        set.entries.push((id, Arc::new(callback)));
        ListenerHandle {
            id,
            listeners: self.clone(),
        }
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().entries.retain(|(entry_id, _)| *entry_id != id);
    }

    fn notify(&self, status: &PollStatus) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe
        let callbacks: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(status);
        }
    }
}

/// Subscription returned by [`Listeners::subscribe`]
///
/// Dropping the handle unsubscribes the callback.
pub struct ListenerHandle {
    id: u64,
    listeners: Listeners,
}

impl ListenerHandle {
    /// Unsubscribes the callback
    pub fn remove(self) {}
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.listeners.remove(self.id);
    }
}

/// Drives poll cycles for one configured location
pub struct Coordinator<S> {
    source: S,
    coordinates: Coordinates,
    interval: Duration,
    status: watch::Sender<PollStatus>,
    listeners: Listeners,
}

impl<S: VisitSource + 'static> Coordinator<S> {
    /// Creates a coordinator with no data
    ///
    /// The interval drives a tokio timer and must be non-zero.
    pub fn new(
        source: S,
        coordinates: Coordinates,
        interval: Duration,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        debug!(
            lat = coordinates.latitude,
            lon = coordinates.longitude,
            ?interval,
            "Initializing coordinator"
        );
        let (status, _) = watch::channel(PollStatus::default());
        Ok(Self {
            source,
            coordinates,
            interval,
            status,
            listeners: Listeners::default(),
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Copy of the current status
    pub fn snapshot(&self) -> PollStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published status
    pub fn watch(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Registers a callback invoked after every completed cycle
    pub fn subscribe<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&PollStatus) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Runs one poll cycle and notifies listeners
    pub async fn refresh(&mut self) -> Result<(), UpdateFailed> {
        debug!("Running coordinator update");
        let outcome = self.source.fetch(self.coordinates).await;
        self.apply(outcome)
    }

    /// Runs the first cycle; its failure is reported to the caller
    pub async fn first_refresh(&mut self) -> Result<(), UpdateFailed> {
        self.refresh().await
    }

    /// Records a cycle outcome, notifies listeners, then publishes the new status
    fn apply(&mut self, outcome: Result<FetchResult, FetchError>) -> Result<(), UpdateFailed> {
        let mut status = self.snapshot();
        let result = match outcome {
            Ok(data) => {
                debug!(count = data.events.len(), region = %data.region, "Update successful");
                status.last_update_success = true;
                status.last_updated = Some(Utc::now());
                status.data = Some(data);
                Ok(())
            }
            Err(err) => {
                status.last_update_success = false;
                Err(UpdateFailed(err))
            }
        };

        self.listeners.notify(&status);
        self.status.send_replace(status);
        result
    }

    /// Moves the coordinator onto its own task and refreshes on every interval tick
    ///
    /// The first tick is skipped; the caller is expected to have run
    /// [`Coordinator::first_refresh`].
    pub fn spawn(mut self) -> CoordinatorHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let status = self.watch();
        let listeners = self.listeners.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let outcome = self.source.fetch(self.coordinates).await;
                        // A fetch still in flight at shutdown completes, but its result is dropped
                        if !matches!(shutdown_rx.try_recv(), Err(mpsc::error::TryRecvError::Empty)) {
                            debug!("Discarding update received after shutdown");
                            break;
                        }
                        if let Err(err) = self.apply(outcome) {
                            warn!(error = %err, "Scheduled update failed, keeping cached data");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
            info!("Coordinator stopped");
        });

        CoordinatorHandle {
            status,
            listeners,
            shutdown_tx,
            task,
        }
    }
}

/// Handle for a coordinator running on its own task
pub struct CoordinatorHandle {
    status: watch::Receiver<PollStatus>,
    listeners: Listeners,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Copy of the current status
    pub fn snapshot(&self) -> PollStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published status
    pub fn watch(&self) -> watch::Receiver<PollStatus> {
        self.status.clone()
    }

    /// Registers a callback invoked after every completed cycle
    pub fn subscribe<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&PollStatus) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Stops the timer and waits for the task to finish
    ///
    /// Returns the join error if the refresh task panicked.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        let _ = self.shutdown_tx.send(()).await;
        self.task.await.map_err(|err| {
            error!(error = %err, "Coordinator task ended abnormally");
            err
        })
    }
}
