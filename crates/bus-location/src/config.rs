//! Pipeline configuration.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use realtime::GeoOptions;

use crate::history::{MAX_HISTORY, clamp_capacity};

/// Pipeline configuration derived from the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Timezone used for the display-formatted `lastUpdated` string.
    pub timezone: Tz,
    pub geo: GeoOptions,
    /// Rider trail length, within `1..=3`.
    pub history_capacity: usize,
    pub recenter_threshold_m: u32,
    pub recenter_zoom: u8,
    pub initial_zoom: u8,
    pub collections: Collections,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let timezone =
            env::var("TIMEZONE").ok().and_then(|value| value.parse::<Tz>().ok()).unwrap_or(Tz::UTC);
        let geo = GeoOptions {
            high_accuracy: env_bool("GEO_HIGH_ACCURACY", true),
            max_cache_age: Duration::from_millis(env_u64("GEO_MAX_CACHE_AGE_MS", 0)),
            timeout: Duration::from_millis(env_u64("GEO_TIMEOUT_MS", 10_000)),
        };

        Self {
            timezone,
            geo,
            history_capacity: clamp_capacity(env_usize("HISTORY_CAPACITY", MAX_HISTORY)),
            recenter_threshold_m: env_u32("RECENTER_THRESHOLD_M", 100),
            recenter_zoom: env_u8("RECENTER_ZOOM", 18),
            initial_zoom: env_u8("INITIAL_ZOOM", 16),
            collections: Collections::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            geo: GeoOptions::default(),
            history_capacity: MAX_HISTORY,
            recenter_threshold_m: 100,
            recenter_zoom: 18,
            initial_zoom: 16,
            collections: Collections::default(),
        }
    }
}

/// Store collection names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub buses: String,
    pub bus_locations: String,
}

impl Collections {
    fn from_env() -> Self {
        Self {
            buses: env::var("BUSES_COLLECTION").unwrap_or_else(|_| "buses".to_string()),
            bus_locations: env::var("BUS_LOCATIONS_COLLECTION")
                .unwrap_or_else(|_| "bus_locations".to_string()),
        }
    }
}

impl Default for Collections {
    fn default() -> Self {
        Self { buses: "buses".to_string(), bus_locations: "bus_locations".to_string() }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|value| value.parse::<u32>().ok()).unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    env::var(key).ok().and_then(|value| value.parse::<u8>().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|value| value.parse::<usize>().ok()).unwrap_or(default)
}
