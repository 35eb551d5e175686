//! In-process [`DocumentStore`].
//!
//! Honours the store contract the pipeline relies on: the current value is pushed
//! on subscribe, every upsert or delete is pushed to the key's listeners, and
//! releasing a listener twice is a no-op. `set_offline` simulates losing the
//! backend: writes fail with `Unavailable` and live listeners receive the error
//! and are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use realtime::{Document, DocumentStore, StoreError, SubscribeError, Watch, WatchId, WriteError};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

type Update = Result<Option<Document>, SubscribeError>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: DashMap<(String, String), Value>,
    listeners: DashMap<WatchId, Listener>,
    offline: AtomicBool,
}

struct Listener {
    collection: String,
    key: String,
    tx: mpsc::UnboundedSender<Update>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a document directly.
    #[must_use]
    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.inner
            .documents
            .get(&(collection.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
        if !offline {
            return;
        }

        let ids: Vec<WatchId> = self.inner.listeners.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, listener)) = self.inner.listeners.remove(&id) {
                warn!(key = %listener.key, "listener failed: store unavailable");
                let _ = listener.tx.send(Err(StoreError::Unavailable));
            }
        }
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    fn notify(&self, collection: &str, key: &str, document: Option<&Document>) {
        let mut closed = Vec::new();
        for entry in &self.inner.listeners {
            let listener = entry.value();
            if listener.collection != collection || listener.key != key {
                continue;
            }
            if listener.tx.send(Ok(document.cloned())).is_err() {
                closed.push(*entry.key());
            }
        }
        for id in closed {
            self.inner.listeners.remove(&id);
        }
    }

    fn sorted(mut docs: Vec<Document>) -> Vec<Document> {
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let docs = self
            .inner
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| Document { id: entry.key().1.clone(), data: entry.value().clone() })
            .collect();
        Ok(Self::sorted(docs))
    }

    async fn query_by_field(
        &self, collection: &str, field: &str, value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let docs = self
            .inner
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection && entry.value().get(field) == Some(value))
            .map(|entry| Document { id: entry.key().1.clone(), data: entry.value().clone() })
            .collect();
        Ok(Self::sorted(docs))
    }

    async fn upsert(&self, collection: &str, key: &str, data: Value) -> Result<(), WriteError> {
        self.check_online()?;
        self.inner.documents.insert((collection.to_string(), key.to_string()), data.clone());
        self.notify(collection, key, Some(&Document { id: key.to_string(), data }));
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), WriteError> {
        self.check_online()?;
        self.inner.documents.remove(&(collection.to_string(), key.to_string()));
        self.notify(collection, key, None);
        Ok(())
    }

    fn subscribe(&self, collection: &str, key: &str) -> Watch<Update> {
        let (tx, watch) = Watch::channel();

        if let Err(err) = self.check_online() {
            let _ = tx.send(Err(err));
            return watch;
        }

        let current = self
            .get(collection, key)
            .map(|data| Document { id: key.to_string(), data });
        let _ = tx.send(Ok(current));

        let listener = Listener { collection: collection.to_string(), key: key.to_string(), tx };
        self.inner.listeners.insert(watch.id, listener);
        debug!(collection, key, watch_id = %watch.id, "listener added");
        watch
    }

    fn unsubscribe(&self, id: WatchId) {
        if self.inner.listeners.remove(&id).is_some() {
            debug!(watch_id = %id, "listener removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn upsert_replaces_wholesale() {
        let store = MemoryStore::new();
        store.upsert("bus_locations", "1", json!({"a": 1, "b": 2})).await.expect("should upsert");
        store.upsert("bus_locations", "1", json!({"a": 3})).await.expect("should upsert");

        assert_eq!(store.get("bus_locations", "1"), Some(json!({"a": 3})));
    }

    #[tokio::test]
    async fn subscribe_absent_delivers_none() {
        let store = MemoryStore::new();
        let mut watch = store.subscribe("bus_locations", "9");
        assert_eq!(watch.updates.recv().await, Some(Ok(None)));
    }

    #[tokio::test]
    async fn listeners_are_keyed() {
        let store = MemoryStore::new();
        let mut one = store.subscribe("bus_locations", "1");
        let mut two = store.subscribe("bus_locations", "2");
        one.updates.recv().await;
        two.updates.recv().await;

        store.upsert("bus_locations", "1", json!({"a": 1})).await.expect("should upsert");

        assert!(one.updates.try_recv().is_ok());
        assert!(two.updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_twice_is_noop() {
        let store = MemoryStore::new();
        let watch = store.subscribe("bus_locations", "1");
        store.unsubscribe(watch.id);
        store.unsubscribe(watch.id);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn offline_fails_writes_and_listeners() {
        let store = MemoryStore::new();
        let mut watch = store.subscribe("bus_locations", "1");
        watch.updates.recv().await;

        store.set_offline(true);

        assert_eq!(watch.updates.recv().await, Some(Err(StoreError::Unavailable)));
        assert_eq!(watch.updates.recv().await, None);
        assert_eq!(
            store.upsert("bus_locations", "1", json!({})).await,
            Err(StoreError::Unavailable)
        );
    }
}
