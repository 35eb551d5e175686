//! Driver dashboard: the assigned bus and its live tracking controls.

use std::sync::Arc;

use bus_location::{
    Bus, Config, LocationPublisher, LocationSampler, LocationStore, TrackingSession,
    TrackingStatus,
};
use realtime::{DocumentStore, Geolocation, Position, SampleError, Session};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::display;

pub const NO_BUS: &str = "No bus assigned to your account.";
pub const SELECT_BUS: &str = "Please select a bus first";
pub const TRACKING_STOPPED: &str = "Location tracking stopped";
pub const UPDATED: &str = "Location updated successfully!";
pub const UPDATE_FAILED: &str = "Error updating location. Please try again.";
pub const NO_POSITION: &str = "Get your current location first";
pub const DELETED: &str = "Location deleted successfully!";
pub const DELETE_FAILED: &str = "Error deleting location. Please try again.";

/// Result of a manual location update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The write failed.
    Failed,
    /// Refused while tracking; live samples already keep the record current.
    Tracking,
    NoBus,
    /// No position known yet; take a one-shot fix first.
    NoPosition,
}

/// State behind the driver dashboard page.
///
/// Tracking starts on load when the driver has a bus assigned. Dropping the
/// dashboard ends tracking.
pub struct DriverDashboard<G, S> {
    driver: Session,
    bus: Option<Bus>,
    tracking: TrackingSession<G, S>,
    status: watch::Receiver<TrackingStatus>,
    message: Option<String>,
    location: Option<String>,
    position: Option<Position>,
    last_update: Option<String>,
}

impl<G, S> DriverDashboard<G, S>
where
    G: Geolocation + 'static,
    S: DocumentStore + 'static,
{
    /// Resolves the driver's bus and starts tracking it.
    pub async fn load(
        driver: Session, geo: Arc<G>, store: LocationStore<S>, config: &Config,
    ) -> Self {
        let bus = match store.assigned_bus(&driver.uid).await {
            Ok(bus) => bus,
            Err(err) => {
                error!(driver = %driver.uid, error = %err, "failed to load assigned bus");
                None
            }
        };

        let publisher = LocationPublisher::new(store, config.timezone);
        let tracking = TrackingSession::new(LocationSampler::new(geo), publisher, config.geo);
        let status = tracking.status();

        let mut dashboard = Self {
            driver,
            bus,
            tracking,
            status,
            message: None,
            location: None,
            position: None,
            last_update: None,
        };
        dashboard.start_tracking();
        dashboard
    }

    #[must_use]
    pub const fn driver(&self) -> &Session {
        &self.driver
    }

    #[must_use]
    pub const fn bus(&self) -> Option<&Bus> {
        self.bus.as_ref()
    }

    fn bus_id(&self) -> Option<String> {
        self.bus.as_ref().map(|bus| bus.id.clone())
    }

    /// Shown instead of the controls when no bus is assigned.
    #[must_use]
    pub const fn notice(&self) -> Option<&'static str> {
        if self.bus.is_none() { Some(NO_BUS) } else { None }
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracking.is_tracking()
    }

    /// The last status message (success or error).
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The current-location line, e.g. `Tracking: (lat, lng)`.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub const fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Display time of the last successful write.
    #[must_use]
    pub fn last_update(&self) -> Option<&str> {
        self.last_update.as_deref()
    }

    /// Starts tracking when stopped, stops it when running.
    pub fn toggle_tracking(&mut self) {
        if self.is_tracking() {
            self.tracking.stop();
            self.message = Some(TRACKING_STOPPED.to_string());
            return;
        }
        if self.bus.is_none() {
            self.message = Some(SELECT_BUS.to_string());
            return;
        }
        self.start_tracking();
    }

    fn start_tracking(&mut self) {
        let Some(bus_id) = self.bus_id() else {
            return;
        };
        match self.tracking.start(&bus_id) {
            Ok(()) => self.message = None,
            Err(err) => {
                warn!(bus_id = %bus_id, error = %err, "could not start tracking");
                self.message = Some(err.message().to_string());
            }
        }
    }

    /// Applies the latest tracking status to the dashboard. Returns the status.
    pub fn sync(&mut self) -> TrackingStatus {
        let status = self.status.borrow_and_update().clone();
        match &status {
            TrackingStatus::Tracking { position, last_updated, .. } => {
                self.position = Some(*position);
                self.location = Some(format!(
                    "Tracking: {}",
                    display::coordinates(position.latitude, position.longitude)
                ));
                if last_updated.is_some() {
                    self.last_update.clone_from(last_updated);
                }
            }
            TrackingStatus::Failed { error, .. } => {
                self.location = Some(error.message().to_string());
            }
            TrackingStatus::Idle | TrackingStatus::Acquiring { .. } | TrackingStatus::Stopped => {}
        }
        status
    }

    /// Waits for a status change not yet applied, then applies it. Returns
    /// `None` once the session has gone away.
    pub async fn changed(&mut self) -> Option<TrackingStatus> {
        self.status.changed().await.ok()?;
        Some(self.sync())
    }

    /// One-shot position fix. Refused while tracking, which already reports the
    /// position continuously.
    ///
    /// # Errors
    ///
    /// Returns the sample error when the platform cannot provide a fix.
    pub async fn current_location(&mut self) -> Result<Option<Position>, SampleError> {
        if self.is_tracking() {
            return Ok(None);
        }
        match self.tracking.sample_once().await {
            Ok(position) => {
                self.position = Some(position);
                self.location = Some(format!(
                    "Current location: {}",
                    display::coordinates(position.latitude, position.longitude)
                ));
                Ok(Some(position))
            }
            Err(err) => {
                warn!(driver = %self.driver.uid, error = %err, "one-shot location failed");
                let text = match err {
                    SampleError::Unsupported => err.message(),
                    _ => "Unable to retrieve location",
                };
                self.location = Some(text.to_string());
                Err(err)
            }
        }
    }

    /// Publishes the last known position once. The manual path does not carry
    /// accuracy, so it is refused while tracking.
    pub async fn update_once(&mut self) -> UpdateOutcome {
        if self.is_tracking() {
            return UpdateOutcome::Tracking;
        }
        let Some(bus_id) = self.bus_id() else {
            self.message = Some(SELECT_BUS.to_string());
            return UpdateOutcome::NoBus;
        };
        let Some(position) = self.position else {
            self.message = Some(NO_POSITION.to_string());
            return UpdateOutcome::NoPosition;
        };
        let position = Position { accuracy: None, ..position };

        match self.tracking.publisher().publish(&bus_id, &position).await {
            Ok(ack) => {
                self.last_update = Some(ack.last_updated);
                self.message = Some(UPDATED.to_string());
                UpdateOutcome::Updated
            }
            Err(err) => {
                error!(bus_id = %bus_id, error = %err, "manual location update failed");
                self.message = Some(UPDATE_FAILED.to_string());
                UpdateOutcome::Failed
            }
        }
    }

    /// Stops tracking, then deletes the bus's location record.
    pub async fn delete_location(&mut self) -> bool {
        let Some(bus_id) = self.bus_id() else {
            self.message = Some(SELECT_BUS.to_string());
            return false;
        };
        self.tracking.stop();

        match self.tracking.publisher().delete(&bus_id).await {
            Ok(_) => {
                info!(bus_id = %bus_id, "location record deleted");
                self.position = None;
                self.location = None;
                self.last_update = None;
                self.message = Some(DELETED.to_string());
                true
            }
            Err(err) => {
                error!(bus_id = %bus_id, error = %err, "location delete failed");
                self.message = Some(DELETE_FAILED.to_string());
                false
            }
        }
    }

    /// Ends tracking and releases the platform watch.
    pub fn close(&mut self) {
        self.tracking.stop();
    }
}
