//! Text and map models shown to users.

use bus_location::{HistoryEntry, LocationRecord};
use serde::Serialize;

/// What the map collaborator draws for one bus: the live marker, its accuracy
/// circle and the recent trail.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapModel {
    pub bus_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub last_updated: String,
    pub history: Vec<HistoryEntry>,
}

impl MapModel {
    #[must_use]
    pub fn new(record: &LocationRecord, history: &[HistoryEntry]) -> Self {
        Self {
            bus_id: record.bus_id.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            accuracy: record.accuracy,
            last_updated: record.last_updated.clone(),
            history: history.to_vec(),
        }
    }

    /// Marker popup text.
    #[must_use]
    pub fn popup(&self) -> String {
        format!(
            "Bus {}\nLat: {:.6}\nLng: {:.6}\nAccuracy: {}\nLast updated: {}",
            self.bus_id,
            self.latitude,
            self.longitude,
            accuracy(self.accuracy),
            last_updated(Some(&self.last_updated)),
        )
    }

    #[must_use]
    pub fn maps_link(&self) -> String {
        maps_link(self.latitude, self.longitude)
    }
}

/// `(lat, lng)` with six decimals.
#[must_use]
pub fn coordinates(latitude: f64, longitude: f64) -> String {
    format!("({latitude:.6}, {longitude:.6})")
}

#[must_use]
pub fn accuracy(accuracy: Option<f64>) -> String {
    accuracy.map_or_else(|| "Unknown".to_string(), |meters| format!("{meters:.2} meters"))
}

#[must_use]
pub fn last_updated(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// External maps link for a position.
#[must_use]
pub fn maps_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={latitude},{longitude}")
}
