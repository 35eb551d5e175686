//! Device position sampling.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use realtime::{GeoOptions, Geolocation, Position, SampleError};
use tracing::{debug, warn};

use crate::subscription::{Canceller, Subscription};

/// Wraps the platform's continuous position reporting.
///
/// At most one continuous watch is held per sampler: `start` releases the
/// previous watch before acquiring a new one, and dropping the sampler releases
/// whatever is still held.
pub struct LocationSampler<G> {
    platform: Arc<G>,
    active: Mutex<Option<Canceller>>,
}

impl<G> LocationSampler<G>
where
    G: Geolocation + 'static,
{
    #[must_use]
    pub const fn new(platform: Arc<G>) -> Self {
        Self { platform, active: Mutex::new(None) }
    }

    /// Starts continuous sampling.
    ///
    /// The returned stream ends after the first error (no automatic retry) or
    /// once the sampler is stopped.
    pub fn start(&self, options: GeoOptions) -> SampleStream {
        self.stop();

        if !self.platform.is_supported() {
            warn!("geolocation is not supported");
            return SampleStream::failed(SampleError::Unsupported);
        }

        let watch = self.platform.watch_position(&options);
        let watch_id = watch.id;
        let platform = Arc::clone(&self.platform);
        let subscription = Subscription::new(watch, move || {
            platform.clear_watch(watch_id);
            debug!(watch_id = %watch_id, "position watch cleared");
        });
        debug!(watch_id = %watch_id, "position watch started");

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(subscription.canceller());
        SampleStream::watching(subscription, options.timeout)
    }

    /// Releases the active watch, if any. Safe to call repeatedly.
    pub fn stop(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(canceller) = active {
            canceller.cancel();
        }
    }

    /// Whether a continuous watch is currently held.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|canceller| !canceller.is_cancelled())
    }

    /// One-shot position query, independent of any continuous watch.
    ///
    /// # Errors
    ///
    /// Returns the platform's [`SampleError`], or `Timeout` when no position
    /// resolves within `options.timeout`.
    pub async fn sample_once(&self, options: &GeoOptions) -> Result<Position, SampleError> {
        if !self.platform.is_supported() {
            return Err(SampleError::Unsupported);
        }
        tokio::time::timeout(options.timeout, self.platform.current_position(options))
            .await
            .unwrap_or(Err(SampleError::Timeout))
    }
}

impl<G> Drop for LocationSampler<G> {
    fn drop(&mut self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(canceller) = active {
            canceller.cancel();
        }
    }
}

impl<G> fmt::Debug for LocationSampler<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationSampler").finish_non_exhaustive()
    }
}

/// Lazy, cancellable sequence of position samples.
pub struct SampleStream {
    inner: BoxStream<'static, Result<Position, SampleError>>,
}

struct Sampling {
    subscription: Subscription<Result<Position, SampleError>>,
    timeout: Duration,
    done: bool,
}

impl SampleStream {
    fn failed(err: SampleError) -> Self {
        Self { inner: stream::once(async move { Err(err) }).boxed() }
    }

    fn watching(
        subscription: Subscription<Result<Position, SampleError>>, timeout: Duration,
    ) -> Self {
        let state = Sampling { subscription, timeout, done: false };

        let inner = stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            let next = tokio::time::timeout(state.timeout, state.subscription.next()).await;

            let err = match next {
                Ok(Some(Ok(position))) => return Some((Ok(position), state)),
                Ok(Some(Err(err))) => err,
                Ok(None) => return None,
                Err(_) => SampleError::Timeout,
            };

            // terminal: release the platform watch now rather than on drop
            warn!(error = %err, "position sampling stopped");
            state.subscription.cancel();
            state.done = true;
            Some((Err(err), state))
        });

        Self { inner: inner.boxed() }
    }
}

impl Stream for SampleStream {
    type Item = Result<Position, SampleError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for SampleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStream").finish_non_exhaustive()
    }
}
