//! # Provider
//!
//! Provider defines the external collaborator interfaces for the workspace: the
//! document store, the device geolocation platform, the authentication service,
//! and the map widget. Only their contracts are relied upon; implementations live
//! with the host.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::error::{AuthError, Result, SampleError, StoreError, SubscribeError, WriteError};

/// Identifies a live registration (store listener or position watch) so it can be
/// released.
pub type WatchId = Uuid;

/// A live registration against a collaborator. Updates are pushed onto `updates`
/// until the registration is released using `id`.
#[derive(Debug)]
pub struct Watch<T> {
    pub id: WatchId,
    pub updates: mpsc::UnboundedReceiver<T>,
}

impl<T> Watch<T> {
    /// Creates a new registration and the sender used to push updates to it.
    #[must_use]
    pub fn channel() -> (mpsc::UnboundedSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { id: Uuid::new_v4(), updates: rx })
    }
}

/// A stored document: its key within the collection and its fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// The `DocumentStore` trait defines the shared keyed record store: point reads,
/// point writes, and live subscription per key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in a collection.
    async fn list(&self, collection: &str) -> std::result::Result<Vec<Document>, StoreError>;

    /// Documents in `collection` whose `field` equals `value`.
    async fn query_by_field(
        &self, collection: &str, field: &str, value: &Value,
    ) -> std::result::Result<Vec<Document>, StoreError>;

    /// Replaces the document stored at `key` wholesale.
    async fn upsert(
        &self, collection: &str, key: &str, data: Value,
    ) -> std::result::Result<(), WriteError>;

    /// Removes the document stored at `key`.
    async fn delete(&self, collection: &str, key: &str) -> std::result::Result<(), WriteError>;

    /// Registers a listener on `key`. The current value (`None` when absent) is
    /// delivered immediately, then again on every change.
    fn subscribe(
        &self, collection: &str, key: &str,
    ) -> Watch<std::result::Result<Option<Document>, SubscribeError>>;

    /// Releases a listener. Releasing an unknown or already released listener is a
    /// no-op.
    fn unsubscribe(&self, id: WatchId);
}

/// Geolocation request options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeoOptions {
    /// Request the best available precision.
    pub high_accuracy: bool,

    /// Reject cached fixes older than this. Zero means always fresh.
    pub max_cache_age: Duration,

    /// Fail a sample attempt that does not resolve in time.
    pub timeout: Duration,
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            max_cache_age: Duration::ZERO,
            timeout: Duration::from_millis(10_000),
        }
    }
}

/// One device position reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,

    /// Accuracy radius in meters, when known.
    pub accuracy: Option<f64>,
}

impl Position {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self { latitude, longitude, accuracy }
    }
}

/// The `Geolocation` trait wraps the device's position reporting capability.
#[async_trait]
pub trait Geolocation: Send + Sync {
    /// Whether the platform offers geolocation at all.
    fn is_supported(&self) -> bool;

    /// One-shot position query.
    async fn current_position(
        &self, options: &GeoOptions,
    ) -> std::result::Result<Position, SampleError>;

    /// Starts continuous position reporting. The platform resource is held until
    /// `clear_watch` is called with the returned id.
    fn watch_position(&self, options: &GeoOptions)
    -> Watch<std::result::Result<Position, SampleError>>;

    /// Releases a continuous position watch.
    fn clear_watch(&self, id: WatchId);
}

/// An authenticated driver session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
}

/// The `Authenticator` trait defines the authentication service contract.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> std::result::Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<()>;

    /// The signed-in session, if any.
    fn current_user(&self) -> Option<Session>;

    /// Push notification of session changes. The receiver holds the current state
    /// on creation, so it fires at least once.
    fn on_auth_state_changed(&self) -> watch::Receiver<Option<Session>>;
}

/// A geographic coordinate as used by the map widget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<&Position> for LatLng {
    fn from(position: &Position) -> Self {
        Self { lat: position.latitude, lng: position.longitude }
    }
}

/// Viewport events emitted by the map widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MapEvent {
    MoveEnd { center: LatLng },
    ZoomEnd { center: LatLng },
}

impl MapEvent {
    #[must_use]
    pub const fn center(&self) -> LatLng {
        match self {
            Self::MoveEnd { center } | Self::ZoomEnd { center } => *center,
        }
    }
}

/// The `MapView` trait exposes the map widget's imperative commands.
pub trait MapView {
    /// Sets the viewport center and zoom level.
    fn set_view(&mut self, center: LatLng, zoom: u8);
}
