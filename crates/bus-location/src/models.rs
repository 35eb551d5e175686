//! Store documents and view models.

use chrono::{DateTime, Utc};
use realtime::{Document, LatLng, Position, Result, SubscribeError};
use serde::{Deserialize, Serialize};

/// An administratively defined bus. Read-only to the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bus {
    /// Document key. Not stored as a field.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    #[serde(rename = "imageUrl", default)]
    pub image_url: String,
    #[serde(rename = "driverID", default)]
    pub driver_id: String,
}

impl TryFrom<Document> for Bus {
    type Error = realtime::Error;

    fn try_from(doc: Document) -> Result<Self> {
        let mut bus: Self = serde_json::from_value(doc.data)?;
        bus.id = doc.id;
        Ok(bus)
    }
}

/// The single current-position document for one bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub bus_id: String,
    pub latitude: f64,
    pub longitude: f64,

    /// Accuracy radius in meters; absent or null when unknown.
    #[serde(default)]
    pub accuracy: Option<f64>,

    /// Machine timestamp of the write.
    pub timestamp: DateTime<Utc>,

    /// Display-formatted time of the write.
    pub last_updated: String,
}

impl LocationRecord {
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude, self.accuracy)
    }

    #[must_use]
    pub const fn lat_lng(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

impl TryFrom<Document> for LocationRecord {
    type Error = realtime::Error;

    fn try_from(doc: Document) -> Result<Self> {
        Ok(serde_json::from_value(doc.data)?)
    }
}

/// One entry of the rider-side recent position trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub last_updated: String,
}

impl HistoryEntry {
    /// Two entries are the same stop on the trail when latitude and longitude match.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn same_position(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl From<&LocationRecord> for HistoryEntry {
    fn from(record: &LocationRecord) -> Self {
        Self {
            latitude: record.latitude,
            longitude: record.longitude,
            accuracy: record.accuracy,
            last_updated: record.last_updated.clone(),
        }
    }
}

/// What a rider sees for the bus being viewed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    /// Whether a live record exists.
    pub exists: bool,
    pub record: Option<LocationRecord>,
    /// At most the configured number of recent distinct positions, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Set when the subscription failed; the view then shows no live data.
    pub error: Option<SubscribeError>,
}

impl ViewState {
    /// No live record for the bus.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failed(error: SubscribeError) -> Self {
        Self { error: Some(error), ..Self::default() }
    }
}

/// Acknowledgement of a successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub bus_id: String,
    pub timestamp: DateTime<Utc>,
    pub last_updated: String,
}
