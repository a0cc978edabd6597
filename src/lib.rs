//! Facade crate for the GNIS gazetteer engine.
//!
//! This crate re-exports the core domain types alongside the acquisition,
//! cache, elevation, and export components so embedders depend on a single
//! crate.

#![forbid(unsafe_code)]

pub use gnis_core::{
    GnisConfig, LatLon, Location, NATIONAL_ALIASES, REGION_CODES, Region, Table, TableError,
    Units, ValidationError, Value, available_locations,
};

pub use gnis_data::{
    AcquireError, AcquireOptions, Acquirer, CacheError, CacheInfo, CacheStore, ElevationClient,
    ElevationError, ExportError, ExportOptions, ExportPipeline, PointElevation, read_delimited,
    write_delimited,
};
