//! Driver-side tracking session.
//!
//! A session owns the one sampling loop a driver client may run. Starting a
//! session for any bus first stops the running one, so tracking for the old bus
//! always ends before tracking for a new bus begins.

use std::sync::Arc;

use futures::StreamExt;
use realtime::{DocumentStore, GeoOptions, Geolocation, Position, Result, SampleError, bad_request};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::publisher::LocationPublisher;
use crate::sampler::{LocationSampler, SampleStream};

/// Observable state of a tracking session.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackingStatus {
    Idle,

    /// Waiting for the first sample.
    Acquiring { bus_id: String },

    /// Sampling; `last_updated` is the display time of the last successful write.
    Tracking { bus_id: String, position: Position, last_updated: Option<String> },

    /// Stopped by the driver.
    Stopped,

    /// Sampling ended with an error; the caller decides whether to restart.
    Failed { bus_id: String, error: SampleError },
}

impl TrackingStatus {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Acquiring { .. } | Self::Tracking { .. })
    }
}

struct Active {
    bus_id: String,
    task: JoinHandle<()>,
}

pub struct TrackingSession<G, S> {
    sampler: LocationSampler<G>,
    publisher: LocationPublisher<S>,
    options: GeoOptions,
    status: Arc<watch::Sender<TrackingStatus>>,
    active: Option<Active>,
}

impl<G, S> TrackingSession<G, S>
where
    G: Geolocation + 'static,
    S: DocumentStore + 'static,
{
    #[must_use]
    pub fn new(sampler: LocationSampler<G>, publisher: LocationPublisher<S>, options: GeoOptions) -> Self {
        let (status, _) = watch::channel(TrackingStatus::Idle);
        Self { sampler, publisher, options, status: Arc::new(status), active: None }
    }

    /// Starts publishing samples for `bus_id`, stopping any running session first.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when `bus_id` is empty.
    pub fn start(&mut self, bus_id: &str) -> Result<()> {
        if bus_id.is_empty() {
            return Err(bad_request!("bus id is required"));
        }
        self.halt();

        let samples = self.sampler.start(self.options);
        self.status.send_replace(TrackingStatus::Acquiring { bus_id: bus_id.to_string() });

        let task = tokio::spawn(run(
            samples,
            self.publisher.clone(),
            bus_id.to_string(),
            Arc::clone(&self.status),
        ));
        info!(bus_id = %bus_id, "location tracking started");
        self.active = Some(Active { bus_id: bus_id.to_string(), task });
        Ok(())
    }

    /// Stops tracking and releases the platform watch. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.halt() {
            self.status.send_replace(TrackingStatus::Stopped);
        }
    }

    /// Whether the sampling loop is still running.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.active.as_ref().is_some_and(|active| !active.task.is_finished())
    }

    /// The bus of the current (or last failed) session.
    #[must_use]
    pub fn bus_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.bus_id.as_str())
    }

    /// Subscribes to status changes.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<TrackingStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn current_status(&self) -> TrackingStatus {
        self.status.borrow().clone()
    }

    /// One-shot position query, independent of the sampling loop.
    ///
    /// # Errors
    ///
    /// Returns the platform's sample error.
    pub async fn sample_once(&self) -> std::result::Result<Position, SampleError> {
        self.sampler.sample_once(&self.options).await
    }

    /// The publisher used by the session, for manual writes and deletes.
    #[must_use]
    pub const fn publisher(&self) -> &LocationPublisher<S> {
        &self.publisher
    }

    fn halt(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        self.sampler.stop();
        active.task.abort();
        info!(bus_id = %active.bus_id, "location tracking stopped");
        true
    }
}

impl<G, S> Drop for TrackingSession<G, S> {
    fn drop(&mut self) {
        // the sampler releases its watch when dropped
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

async fn run<S>(
    mut samples: SampleStream, publisher: LocationPublisher<S>, bus_id: String,
    status: Arc<watch::Sender<TrackingStatus>>,
) where
    S: DocumentStore + 'static,
{
    let mut last_updated = None;

    while let Some(sample) = samples.next().await {
        match sample {
            Ok(position) => {
                // failed writes are dropped; the next sample writes again
                match publisher.publish(&bus_id, &position).await {
                    Ok(ack) => last_updated = Some(ack.last_updated),
                    Err(err) => warn!(bus_id = %bus_id, error = %err, "location write dropped"),
                }
                status.send_replace(TrackingStatus::Tracking {
                    bus_id: bus_id.clone(),
                    position,
                    last_updated: last_updated.clone(),
                });
            }
            Err(error) => {
                warn!(bus_id = %bus_id, error = %error, "location tracking failed");
                status.send_replace(TrackingStatus::Failed { bus_id: bus_id.clone(), error });
                return;
            }
        }
    }
}
