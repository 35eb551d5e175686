//! Fixed route schedules shown on the bus page.

use serde::Serialize;

/// One stop on a bus's route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RouteStop {
    pub stop: &'static str,
    pub time: &'static str,
}

const fn at(stop: &'static str, time: &'static str) -> RouteStop {
    RouteStop { stop, time }
}

const ROUTE_1: [RouteStop; 3] =
    [at("Campus", "8:00 AM"), at("Downtown", "8:30 AM"), at("Library", "9:00 AM")];
const ROUTE_2: [RouteStop; 3] =
    [at("Campus", "9:00 AM"), at("Mall", "9:30 AM"), at("Stadium", "10:00 AM")];
const ROUTE_3: [RouteStop; 3] =
    [at("Campus", "10:00 AM"), at("Hospital", "10:30 AM"), at("Park", "11:00 AM")];

/// The schedule of a bus, in stop order. Empty for a bus without one.
#[must_use]
pub fn schedule(bus_id: &str) -> &'static [RouteStop] {
    match bus_id {
        "1" => &ROUTE_1,
        "2" => &ROUTE_2,
        "3" => &ROUTE_3,
        _ => &[],
    }
}
