//! Live bus location pipeline.
//!
//! A driver's device is sampled by [`LocationSampler`], each sample is written by
//! [`LocationPublisher`] to the shared [`LocationStore`], riders follow a bus through
//! [`LocationSubscriber`], and [`ViewportController`] decides when the map has
//! drifted far enough from the bus to offer a recenter.

pub mod config;
pub mod history;
pub mod memory;
pub mod models;
pub mod publisher;
pub mod sampler;
pub mod store;
pub mod subscriber;
pub mod subscription;
pub mod tracking;
pub mod viewport;

pub use config::Config;
pub use history::HistoryBuffer;
pub use memory::MemoryStore;
pub use models::*;
pub use publisher::LocationPublisher;
pub use sampler::{LocationSampler, SampleStream};
pub use store::LocationStore;
pub use subscriber::{LocationSubscriber, ViewStream};
pub use subscription::Subscription;
pub use tracking::{TrackingSession, TrackingStatus};
pub use viewport::ViewportController;
