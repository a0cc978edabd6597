//! Data access and enrichment logic for the GNIS gazetteer engine.
//!
//! Responsibilities:
//! - Download published gazetteer archives and extract their GeoPackage.
//! - Cache extracted GeoPackages on disk, keyed by location.
//! - Read named layers from GeoPackage files into [`gnis_core::Table`]s.
//! - Join, filter, and elevation-annotate records, then export them.
//!
//! Boundaries:
//! - Do not encode domain validation (lives in `gnis-core`).
//! - Public operations are synchronous; HTTP adapters bridge onto an owned
//!   Tokio runtime internally.
//!
//! Invariants:
//! - No global mutable state; every component takes a [`gnis_core::GnisConfig`].
//! - Ephemeral GeoPackages are removed on every exit path.
#![forbid(unsafe_code)]

pub mod acquire;
pub mod cache;
pub mod delimited;
pub mod elevation;
pub mod enrich;
mod error;
pub mod gpkg;
mod http;

#[doc(hidden)]
pub mod test_support;

pub use acquire::{
    AcquireOptions, Acquirer, ArchiveReader, ArchiveTransport, ExtractError, HttpArchiveTransport,
    ZipArchiveReader, archive_url, download_archive, extract_member,
};
pub use cache::{CacheEntryInfo, CacheInfo, CacheLookup, CacheStore};
pub use delimited::{DelimitedError, read_delimited, write_delimited};
pub use elevation::{ElevationClient, ElevationService, HttpElevationService, PointElevation};
pub use enrich::{ExportOptions, ExportPipeline, Pacer, ThreadSleep};
pub use error::{AcquireError, CacheError, ElevationError, ExportError, TransportError};
pub use gpkg::{GeoPackageReader, LayerError, LayerReader};
