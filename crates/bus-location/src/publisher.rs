//! Writes driver position samples to the shared store.
//!
//! Every sample produces exactly one remote write: there is no batching,
//! debouncing or local write queue. Writes replace the whole record (last writer
//! wins). Writes issued concurrently for the same bus are not sequenced, so their
//! arrival order at the store is not guaranteed; a single sampling loop per
//! driver keeps them serialized in practice.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use realtime::{DocumentStore, Position, Result, bad_request};
use tracing::debug;

use crate::models::{Ack, LocationRecord};
use crate::store::LocationStore;

const TIME_FORMAT: &str = "%-I:%M:%S %p";

pub struct LocationPublisher<S> {
    store: LocationStore<S>,
    timezone: Tz,
}

impl<S> Clone for LocationPublisher<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), timezone: self.timezone }
    }
}

impl<S> LocationPublisher<S>
where
    S: DocumentStore + 'static,
{
    #[must_use]
    pub const fn new(store: LocationStore<S>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Upserts the bus's location record from `position`.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an empty bus id or non-numeric coordinates, or the
    /// store's write error. Failed writes are not retried.
    pub async fn publish(&self, bus_id: &str, position: &Position) -> Result<Ack> {
        if bus_id.is_empty() {
            return Err(bad_request!("bus id is required"));
        }
        if !position.latitude.is_finite() || !position.longitude.is_finite() {
            return Err(bad_request!(
                "invalid coordinates ({}, {})",
                position.latitude,
                position.longitude
            ));
        }

        let now = Utc::now();
        let record = LocationRecord {
            bus_id: bus_id.to_string(),
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: position.accuracy,
            timestamp: now,
            last_updated: self.display_time(now),
        };
        self.store.upsert(&record).await?;

        debug!(bus_id = %bus_id, latitude = record.latitude, longitude = record.longitude, "location published");
        Ok(Ack { bus_id: record.bus_id, timestamp: now, last_updated: record.last_updated })
    }

    /// Removes the bus's location record; subscribers then observe no record.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an empty bus id, or the store's write error.
    pub async fn delete(&self, bus_id: &str) -> Result<Ack> {
        if bus_id.is_empty() {
            return Err(bad_request!("bus id is required"));
        }
        self.store.delete(bus_id).await?;

        let now = Utc::now();
        debug!(bus_id = %bus_id, "location deleted");
        Ok(Ack { bus_id: bus_id.to_string(), timestamp: now, last_updated: self.display_time(now) })
    }

    fn display_time(&self, at: DateTime<Utc>) -> String {
        format_time(at, self.timezone)
    }
}

/// Formats an instant as a local wall-clock time, e.g. `8:05:09 AM`.
#[must_use]
pub fn format_time(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone).format(TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use realtime::{Error, StoreError};
    use serde_json::json;

    use super::*;
    use crate::config::Collections;
    use crate::memory::MemoryStore;

    fn publisher() -> (MemoryStore, LocationPublisher<MemoryStore>) {
        let memory = MemoryStore::new();
        let store = LocationStore::new(Arc::new(memory.clone()), Collections::default());
        (memory, LocationPublisher::new(store, Tz::UTC))
    }

    #[tokio::test]
    async fn last_publish_wins_without_merge() {
        let (memory, publisher) = publisher();

        publisher.publish("2", &Position::new(1.0, 2.0, Some(5.0))).await.expect("should publish");
        publisher.publish("2", &Position::new(3.0, 4.0, None)).await.expect("should publish");

        let stored = memory.get("bus_locations", "2").expect("record exists");
        assert_eq!(stored["latitude"], json!(3.0));
        assert_eq!(stored["longitude"], json!(4.0));
        assert_eq!(stored["accuracy"], json!(null));
        assert_eq!(stored["busId"], json!("2"));
    }

    #[tokio::test]
    async fn rejects_empty_bus_id() {
        let (memory, publisher) = publisher();
        let err = publisher.publish("", &Position::new(1.0, 2.0, None)).await.unwrap_err();

        assert_eq!(err.code(), "bad_request");
        assert_eq!(memory.get("bus_locations", ""), None);
    }

    #[tokio::test]
    async fn rejects_non_numeric_coordinates() {
        let (_, publisher) = publisher();
        let err = publisher.publish("1", &Position::new(f64::NAN, 2.0, None)).await.unwrap_err();
        assert_eq!(err.code(), "bad_request");
    }

    #[tokio::test]
    async fn write_error_is_reported() {
        let (memory, publisher) = publisher();
        memory.set_offline(true);

        let err = publisher.publish("1", &Position::new(1.0, 2.0, None)).await.unwrap_err();
        assert_eq!(err, Error::Store(StoreError::Unavailable));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (memory, publisher) = publisher();
        publisher.publish("1", &Position::new(1.0, 2.0, None)).await.expect("should publish");
        publisher.delete("1").await.expect("should delete");

        assert_eq!(memory.get("bus_locations", "1"), None);
    }

    #[test]
    fn formats_wall_clock_time() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 20, 5, 9).unwrap();
        assert_eq!(format_time(at, Tz::UTC), "8:05:09 PM");
        assert_eq!(format_time(at, chrono_tz::Pacific::Auckland), "8:05:09 AM");
    }
}
