//! Recenter affordance for the rider's map.

use realtime::{LatLng, MapEvent, MapView};
use tracing::debug;

use crate::config::Config;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle (haversine) distance between two points, in meters.
#[must_use]
pub fn distance_m(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Decides when the viewport has drifted far enough from the bus to offer a
/// recenter.
///
/// Only viewport move-end and zoom-end events re-evaluate the decision; a new bus
/// position is recorded and used at the next event.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportController {
    bus: Option<LatLng>,
    show_recenter: bool,
    last_distance: Option<f64>,
    threshold_m: f64,
    zoom: u8,
}

impl ViewportController {
    #[must_use]
    pub const fn new(threshold_m: f64, zoom: u8) -> Self {
        Self { bus: None, show_recenter: false, last_distance: None, threshold_m, zoom }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(f64::from(config.recenter_threshold_m), config.recenter_zoom)
    }

    /// Records the latest bus position.
    pub const fn update_position(&mut self, position: LatLng) {
        self.bus = Some(position);
    }

    /// Forgets the bus position once its record is gone. Hides the affordance.
    pub const fn clear_position(&mut self) {
        self.bus = None;
        self.show_recenter = false;
        self.last_distance = None;
    }

    /// Re-evaluates against the viewport center carried by `event`. Returns
    /// whether the recenter affordance is shown.
    pub fn handle(&mut self, event: MapEvent) -> bool {
        let Some(bus) = self.bus else {
            self.show_recenter = false;
            return false;
        };
        let distance = distance_m(event.center(), bus);
        self.last_distance = Some(distance);
        self.show_recenter = distance > self.threshold_m;
        self.show_recenter
    }

    #[must_use]
    pub const fn show_recenter(&self) -> bool {
        self.show_recenter
    }

    /// Distance computed at the most recent viewport event.
    #[must_use]
    pub const fn last_distance(&self) -> Option<f64> {
        self.last_distance
    }

    /// Centers `map` on the bus at the close-up zoom and hides the affordance.
    /// One-shot: later viewport motion can show the affordance again. Returns
    /// false when no bus position is known.
    pub fn recenter(&mut self, map: &mut impl MapView) -> bool {
        let Some(bus) = self.bus else {
            return false;
        };
        debug!(lat = bus.lat, lng = bus.lng, zoom = self.zoom, "recentering map");
        map.set_view(bus, self.zoom);
        self.show_recenter = false;
        true
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(100.0, 18)
    }
}
