//! Typed access to the bus collections of a [`DocumentStore`].

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::Map;
use realtime::{Document, DocumentStore, Result, SubscribeError};
use serde_json::json;
use tracing::debug;

use crate::config::Collections;
use crate::models::{Bus, LocationRecord};
use crate::subscription::Subscription;

/// Update as pushed by the store.
pub type RawUpdate = std::result::Result<Option<Document>, SubscribeError>;

/// Update decoded to a location record. `Ok(None)` means no live record.
pub type RecordUpdate = Result<Option<LocationRecord>>;

/// Live subscription to one bus's location record.
pub type RecordSubscription = Map<Subscription<RawUpdate>, fn(RawUpdate) -> RecordUpdate>;

/// Adapter over the store so the rest of the pipeline never depends on a
/// specific store.
pub struct LocationStore<S> {
    store: Arc<S>,
    collections: Collections,
}

impl<S> Clone for LocationStore<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), collections: self.collections.clone() }
    }
}

impl<S> LocationStore<S>
where
    S: DocumentStore + 'static,
{
    #[must_use]
    pub const fn new(store: Arc<S>, collections: Collections) -> Self {
        Self { store, collections }
    }

    /// Replaces the bus's location record wholesale.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub async fn upsert(&self, record: &LocationRecord) -> Result<()> {
        let data = serde_json::to_value(record)?;
        self.store.upsert(&self.collections.bus_locations, &record.bus_id, data).await?;
        Ok(())
    }

    /// Removes the bus's location record.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub async fn delete(&self, bus_id: &str) -> Result<()> {
        self.store.delete(&self.collections.bus_locations, bus_id).await?;
        Ok(())
    }

    /// Subscribes to the bus's location record. The current value arrives first.
    #[must_use]
    pub fn subscribe(&self, bus_id: &str) -> RecordSubscription {
        let watch = self.store.subscribe(&self.collections.bus_locations, bus_id);
        let watch_id = watch.id;
        let store = Arc::clone(&self.store);
        let bus_id = bus_id.to_string();
        debug!(bus_id = %bus_id, watch_id = %watch_id, "location listener registered");

        let subscription = Subscription::new(watch, move || {
            store.unsubscribe(watch_id);
            debug!(bus_id = %bus_id, watch_id = %watch_id, "location listener released");
        });
        subscription.map(decode as fn(RawUpdate) -> RecordUpdate)
    }

    /// The bus assigned to a driver, if any. The first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails or the bus document is malformed.
    pub async fn assigned_bus(&self, driver_id: &str) -> Result<Option<Bus>> {
        let docs =
            self.store.query_by_field(&self.collections.buses, "driverID", &json!(driver_id)).await?;
        docs.into_iter().next().map(Bus::try_from).transpose()
    }

    /// Every bus.
    ///
    /// # Errors
    ///
    /// Returns an error when the list fails or a bus document is malformed.
    pub async fn buses(&self) -> Result<Vec<Bus>> {
        let docs = self.store.list(&self.collections.buses).await?;
        docs.into_iter().map(Bus::try_from).collect()
    }
}

fn decode(update: RawUpdate) -> RecordUpdate {
    update?.map(LocationRecord::try_from).transpose()
}
