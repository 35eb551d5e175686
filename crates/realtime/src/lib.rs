//! # Realtime Core
//!
//! Core modules for the bus tracker: the error taxonomy shared by every layer and
//! the interfaces of the external collaborators (document store, device
//! geolocation, authentication, and map widget).

mod error;
mod provider;

pub use crate::error::*;
pub use crate::provider::*;
