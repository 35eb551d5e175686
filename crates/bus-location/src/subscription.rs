//! Cancellable live registrations.
//!
//! A [`Subscription`] turns a collaborator [`Watch`] into a lazy `Stream` and owns
//! the action that releases the collaborator resource. The release action runs
//! exactly once: on the first `cancel()`, on a [`Canceller`], or when the
//! subscription is dropped.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use realtime::{Watch, WatchId};
use tokio::sync::mpsc;

type ReleaseFn = Box<dyn FnOnce() + Send>;

struct Release {
    cancelled: AtomicBool,
    action: Mutex<Option<ReleaseFn>>,
}

impl Release {
    fn run(&self) {
        self.cancelled.store(true, Ordering::Release);
        let action = self.action.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A live push-update registration against a store key or a device sensor.
pub struct Subscription<T> {
    id: WatchId,
    updates: mpsc::UnboundedReceiver<T>,
    release: Arc<Release>,
}

impl<T> Subscription<T> {
    /// Wraps `watch`; `release` is invoked once when the subscription is cancelled
    /// or dropped.
    pub fn new(watch: Watch<T>, release: impl FnOnce() + Send + 'static) -> Self {
        let release =
            Release { cancelled: AtomicBool::new(false), action: Mutex::new(Some(Box::new(release))) };
        Self { id: watch.id, updates: watch.updates, release: Arc::new(release) }
    }

    #[must_use]
    pub const fn id(&self) -> WatchId {
        self.id
    }

    /// Releases the underlying resource. Further calls are no-ops and the stream
    /// yields `None` afterwards.
    pub fn cancel(&self) {
        self.release.run();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.release.is_cancelled()
    }

    /// A handle able to cancel this subscription from elsewhere.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller { release: Arc::clone(&self.release) }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if this.release.is_cancelled() {
            return Poll::Ready(None);
        }
        this.updates.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release.run();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Cancels a [`Subscription`] it was created from.
#[derive(Clone)]
pub struct Canceller {
    release: Arc<Release>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.release.run();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.release.is_cancelled()
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller").field("cancelled", &self.is_cancelled()).finish()
    }
}
