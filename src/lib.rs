//! # Bus Tracker
//!
//! Application state for the campus bus tracker. Riders browse the bus list and
//! follow one bus on a map; an authenticated driver publishes their device's live
//! position for the bus assigned to them. The live-location pipeline itself lives
//! in the `bus_location` crate; this crate wires it to the page flow.

pub mod app;
pub mod display;
pub mod driver;
pub mod rider;
pub mod route;

pub use app::{App, Page};
pub use display::MapModel;
pub use driver::{DriverDashboard, UpdateOutcome};
pub use rider::{BusList, BusLocationView};
pub use route::RouteStop;
