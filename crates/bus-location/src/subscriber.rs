//! Rider-side view of one bus's live location.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use realtime::{DocumentStore, Error, StoreError};
use tracing::{debug, error, warn};

use crate::history::HistoryBuffer;
use crate::models::ViewState;
use crate::store::{LocationStore, RecordSubscription, RecordUpdate};

/// Follows the location record of the bus a rider selected.
///
/// Selecting another bus cancels the previous subscription and starts over with
/// an empty history.
pub struct LocationSubscriber<S> {
    store: LocationStore<S>,
    history_capacity: usize,
    current: Option<ViewStream>,
}

impl<S> LocationSubscriber<S>
where
    S: DocumentStore + 'static,
{
    #[must_use]
    pub const fn new(store: LocationStore<S>, history_capacity: usize) -> Self {
        Self { store, history_capacity, current: None }
    }

    /// Starts watching `bus_id`, replacing any previous watch.
    pub fn watch(&mut self, bus_id: &str) {
        self.stop();
        let updates = self.store.subscribe(bus_id);
        self.current = Some(ViewStream::new(bus_id, updates, self.history_capacity));
    }

    /// Cancels the current watch, if any.
    pub fn stop(&mut self) {
        if let Some(current) = self.current.take() {
            debug!(bus_id = %current.bus_id, "stopped watching bus");
            current.cancel();
        }
    }

    /// The bus being watched.
    #[must_use]
    pub fn bus_id(&self) -> Option<&str> {
        self.current.as_ref().map(|current| current.bus_id.as_str())
    }

    /// Waits for the next view of the watched bus. Returns `None` when nothing is
    /// watched or the subscription has ended.
    pub async fn next(&mut self) -> Option<ViewState> {
        self.current.as_mut()?.next().await
    }
}

impl<S> Drop for LocationSubscriber<S> {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }
}

/// Stream of [`ViewState`] for one bus, derived from its record subscription.
pub struct ViewStream {
    bus_id: String,
    updates: RecordSubscription,
    history: HistoryBuffer,
}

impl ViewStream {
    #[must_use]
    pub fn new(bus_id: &str, updates: RecordSubscription, history_capacity: usize) -> Self {
        Self { bus_id: bus_id.to_string(), updates, history: HistoryBuffer::new(history_capacity) }
    }

    #[must_use]
    pub fn bus_id(&self) -> &str {
        &self.bus_id
    }

    pub fn cancel(&self) {
        self.updates.get_ref().cancel();
    }

    fn apply(&mut self, update: RecordUpdate) -> ViewState {
        match update {
            Ok(Some(record)) => {
                self.history.push(&record);
                ViewState {
                    exists: true,
                    record: Some(record),
                    history: self.history.to_vec(),
                    error: None,
                }
            }
            Ok(None) => {
                self.history.clear();
                ViewState::absent()
            }
            Err(Error::Store(err)) => {
                // the store drops a failed listener; stay inactive until re-watched
                error!(bus_id = %self.bus_id, error = %err, "location subscription failed");
                self.history.clear();
                self.cancel();
                ViewState::failed(err)
            }
            Err(err) => {
                warn!(bus_id = %self.bus_id, error = %err, "unreadable location record");
                self.history.clear();
                ViewState::failed(StoreError::Unknown(err.description()))
            }
        }
    }
}

impl Stream for ViewStream {
    type Item = ViewState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ViewState>> {
        let this = self.get_mut();
        match this.updates.poll_next_unpin(cx) {
            Poll::Ready(Some(update)) => Poll::Ready(Some(this.apply(update))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
