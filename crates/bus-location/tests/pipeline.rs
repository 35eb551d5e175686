#![allow(missing_docs)]


use std::sync::Arc;
use std::time::Duration;

use bus_location::config::Collections;
use bus_location::{
    LocationPublisher, LocationSampler, LocationStore, LocationSubscriber, MemoryStore,
    TrackingSession, TrackingStatus, ViewState,
};
use chrono_tz::Tz;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use realtime::{GeoOptions, SampleError, StoreError};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use self::provider::MockGeolocation;

struct Harness {
    geo: MockGeolocation,
    memory: MemoryStore,
    store: LocationStore<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let memory = MemoryStore::new();
        let store = LocationStore::new(Arc::new(memory.clone()), Collections::default());
        Self { geo: MockGeolocation::new(), memory, store }
    }

    fn sampler(&self) -> LocationSampler<MockGeolocation> {
        LocationSampler::new(Arc::new(self.geo.clone()))
    }

    fn session(&self) -> TrackingSession<MockGeolocation, MemoryStore> {
        let publisher = LocationPublisher::new(self.store.clone(), Tz::UTC);
        TrackingSession::new(self.sampler(), publisher, GeoOptions::default())
    }

    fn subscriber(&self) -> LocationSubscriber<MemoryStore> {
        LocationSubscriber::new(self.store.clone(), 3)
    }
}

// Should release the previous platform watch exactly once before a restart.
#[tokio::test]
async fn restart_releases_previous_watch_once() {
    let harness = Harness::new();
    let sampler = harness.sampler();

    let first = sampler.start(GeoOptions::default());
    let _second = sampler.start(GeoOptions::default());

    let started = harness.geo.started();
    assert_eq!(started.len(), 2);
    assert_eq!(harness.geo.cleared(), vec![started[0]]);
    assert_eq!(harness.geo.active_watches(), 1);

    // dropping the stale stream must not release anything again
    drop(first);
    assert_eq!(harness.geo.cleared(), vec![started[0]]);

    sampler.stop();
    sampler.stop();
    assert_eq!(harness.geo.cleared(), started);
    assert!(!sampler.is_active());
}

// Should forward the configured options to the platform.
#[tokio::test]
async fn options_reach_platform() {
    let harness = Harness::new();
    let sampler = harness.sampler();
    let options = GeoOptions { high_accuracy: false, ..GeoOptions::default() };

    let _samples = sampler.start(options);
    assert_eq!(harness.geo.options(), vec![options]);
}

// Should end the sample stream after the first error.
#[tokio::test]
async fn stream_ends_on_error() {
    let harness = Harness::new();
    let sampler = harness.sampler();
    let mut samples = sampler.start(GeoOptions::default());

    harness.geo.emit(1.0, 2.0, Some(5.0));
    harness.geo.fail(SampleError::PermissionDenied);
    harness.geo.emit(3.0, 4.0, None);

    assert_eq!(samples.next().await.map(|s| s.map(|p| p.latitude)), Some(Ok(1.0)));
    assert_eq!(samples.next().await, Some(Err(SampleError::PermissionDenied)));
    assert_eq!(samples.next().await, None);
    assert_eq!(harness.geo.active_watches(), 0);
}

// Should report an unsupported platform without acquiring anything.
#[tokio::test]
async fn unsupported_platform() {
    let geo = MockGeolocation::unsupported();
    let sampler = LocationSampler::new(Arc::new(geo.clone()));

    let mut samples = sampler.start(GeoOptions::default());
    assert_eq!(samples.next().await, Some(Err(SampleError::Unsupported)));
    assert_eq!(samples.next().await, None);
    assert!(geo.started().is_empty());

    assert_eq!(sampler.sample_once(&GeoOptions::default()).await, Err(SampleError::Unsupported));
}

// Should fail a sample attempt that does not resolve in time.
#[tokio::test(start_paused = true)]
async fn sample_timeout() {
    let harness = Harness::new();
    let sampler = harness.sampler();
    let options = GeoOptions { timeout: Duration::from_secs(10), ..GeoOptions::default() };

    let mut samples = sampler.start(options);
    assert_eq!(samples.next().await, Some(Err(SampleError::Timeout)));
    assert_eq!(samples.next().await, None);
    assert_eq!(harness.geo.active_watches(), 0);

    assert_eq!(sampler.sample_once(&options).await, Err(SampleError::Timeout));
}

// Should answer a one-shot query while a continuous watch is active.
#[tokio::test]
async fn one_shot_is_independent() {
    let harness = Harness::new();
    let sampler = harness.sampler();
    let _samples = sampler.start(GeoOptions::default());

    harness.geo.set_current(Some(Ok(realtime::Position::new(5.0, 6.0, None))));
    let position = sampler.sample_once(&GeoOptions::default()).await.expect("should sample");

    assert_eq!(position.latitude, 5.0);
    assert!(sampler.is_active());
}

// Driver tracks bus "2"; the store holds only the last sample and the rider's
// history dedups the repeated position.
#[tokio::test]
async fn driver_to_rider_scenario() {
    let harness = Harness::new();
    let mut subscriber = harness.subscriber();
    subscriber.watch("2");
    assert_eq!(subscriber.next().await, Some(ViewState::absent()));

    let mut session = harness.session();
    session.start("2").expect("should start");

    harness.geo.emit(10.0, 20.0, Some(8.0));
    let view = subscriber.next().await.expect("first sample");
    assert!(view.exists);
    assert_eq!(view.history.len(), 1);

    harness.geo.emit(10.0001, 20.0001, Some(6.0));
    let view = subscriber.next().await.expect("second sample");
    assert_eq!(view.history.len(), 2);

    harness.geo.emit(10.0001, 20.0001, Some(4.0));
    let view = subscriber.next().await.expect("third sample");
    let positions: Vec<(f64, f64)> =
        view.history.iter().map(|e| (e.latitude, e.longitude)).collect();
    assert_eq!(positions, vec![(10.0, 20.0), (10.0001, 20.0001)]);

    let stored = harness.memory.get("bus_locations", "2").expect("record");
    assert_eq!(stored["latitude"], json!(10.0001));
    assert_eq!(stored["longitude"], json!(20.0001));
    assert_eq!(stored["accuracy"], json!(4.0));

    session.stop();
    assert_eq!(harness.geo.active_watches(), 0);
    assert_eq!(session.current_status(), TrackingStatus::Stopped);
}

// Deleting the record clears every subscriber within one notification.
#[tokio::test]
async fn delete_reaches_every_subscriber() {
    let harness = Harness::new();
    let publisher = LocationPublisher::new(harness.store.clone(), Tz::UTC);
    publisher
        .publish("1", &realtime::Position::new(1.0, 1.0, None))
        .await
        .expect("should publish");

    let mut riders = vec![harness.subscriber(), harness.subscriber()];
    for rider in &mut riders {
        rider.watch("1");
        assert!(rider.next().await.expect("view").exists);
    }

    publisher.delete("1").await.expect("should delete");
    for rider in &mut riders {
        assert_eq!(rider.next().await, Some(ViewState::absent()));
    }
}

// Reassigning the bus stops tracking for the old bus before the new one starts.
#[tokio::test]
async fn reassignment_stops_old_bus_first() {
    let harness = Harness::new();
    let mut session = harness.session();

    session.start("1").expect("should start");
    session.start("2").expect("should start");

    let started = harness.geo.started();
    assert_eq!(harness.geo.cleared(), vec![started[0]]);
    assert_eq!(session.bus_id(), Some("2"));

    let mut status = session.status();
    harness.geo.emit(1.0, 1.0, None);
    status
        .wait_for(|s| matches!(s, TrackingStatus::Tracking { .. }))
        .await
        .expect("status");

    assert!(harness.memory.get("bus_locations", "1").is_none());
    assert!(harness.memory.get("bus_locations", "2").is_some());
}

// A sample error stops tracking and releases the watch.
#[tokio::test]
async fn sample_error_fails_session() {
    let harness = Harness::new();
    let mut session = harness.session();
    let mut status = session.status();
    session.start("1").expect("should start");

    harness.geo.fail(SampleError::PositionUnavailable);
    let failed = status
        .wait_for(|s| matches!(s, TrackingStatus::Failed { .. }))
        .await
        .expect("status")
        .clone();

    assert_eq!(
        failed,
        TrackingStatus::Failed { bus_id: "1".to_string(), error: SampleError::PositionUnavailable }
    );
    assert_eq!(harness.geo.active_watches(), 0);
    tokio::task::yield_now().await;
    assert!(!session.is_tracking());
}

// A failed write is dropped and the next sample writes again.
#[tokio::test]
async fn failed_write_is_dropped() {
    let harness = Harness::new();
    let mut session = harness.session();
    let mut status = session.status();
    session.start("1").expect("should start");

    harness.memory.set_offline(true);
    harness.geo.emit(1.0, 1.0, None);
    let current = status
        .wait_for(|s| matches!(s, TrackingStatus::Tracking { .. }))
        .await
        .expect("status")
        .clone();
    assert!(matches!(current, TrackingStatus::Tracking { last_updated: None, .. }));
    assert!(session.is_tracking());

    harness.memory.set_offline(false);
    harness.geo.emit(2.0, 2.0, None);
    status
        .wait_for(|s| matches!(s, TrackingStatus::Tracking { last_updated: Some(_), .. }))
        .await
        .expect("status");

    let stored = harness.memory.get("bus_locations", "1").expect("record");
    assert_eq!(stored["latitude"], json!(2.0));
}

// Dropping the session releases the platform watch.
#[tokio::test]
async fn teardown_releases_watch() {
    let harness = Harness::new();
    let mut session = harness.session();
    session.start("1").expect("should start");
    assert_eq!(harness.geo.active_watches(), 1);

    drop(session);
    tokio::task::yield_now().await;
    assert_eq!(harness.geo.active_watches(), 0);
    assert_eq!(harness.geo.cleared().len(), 1);
}

// A rider whose listener fails sees no live data and stays inactive.
#[tokio::test]
async fn rider_listener_failure() {
    let harness = Harness::new();
    let mut subscriber = harness.subscriber();
    subscriber.watch("1");
    subscriber.next().await;

    harness.memory.set_offline(true);
    let view = subscriber.next().await.expect("view");
    assert_eq!(view.error, Some(StoreError::Unavailable));
    assert!(!view.exists);

    harness.memory.set_offline(false);
    subscriber.watch("1");
    assert_eq!(subscriber.next().await, Some(ViewState::absent()));
}
