//! Core domain types for the GNIS gazetteer engine.
//!
//! These models carry no I/O. Constructors validate their input and return
//! `Result` so malformed locations, coordinates, or units are rejected before
//! any network or filesystem work begins.
#![forbid(unsafe_code)]

pub mod config;
mod coordinates;
mod error;
mod location;
mod table;
mod units;

pub use config::GnisConfig;
pub use coordinates::LatLon;
pub use error::{TableError, ValidationError};
pub use location::{Location, NATIONAL_ALIASES, REGION_CODES, Region, available_locations};
pub use table::{Table, Value};
pub use units::Units;
