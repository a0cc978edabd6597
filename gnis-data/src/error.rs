//! Error types shared by the acquisition, cache, elevation, and export paths.
//!
//! Validation failures keep their own variant in every enum so callers can
//! tell bad input apart from an unavailable service via `is_validation`.

use std::{io, path::PathBuf};

use gnis_core::{Location, TableError, ValidationError};
use thiserror::Error;

use crate::delimited::DelimitedError;
use crate::gpkg::LayerError;

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
    },
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
        /// Timeout that elapsed, in whole seconds.
        timeout_secs: u64,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport or the sink.
        source: io::Error,
    },
    /// A configured endpoint is not a valid URL.
    #[error("invalid endpoint {url}: {source}")]
    InvalidUrl {
        /// Rejected URL text.
        url: String,
        /// Parser diagnostic.
        source: url::ParseError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// The Tokio runtime backing the client could not be constructed.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Failures while reading or writing the on-disk cache.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The cache root could not be created.
    #[error("failed to create cache directory {path:?}: {source}")]
    CreateRoot { path: PathBuf, source: io::Error },
    /// Writing a cache entry failed.
    #[error("failed to write cache entry {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    /// Reading a cache entry failed.
    #[error("failed to read cache entry {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    /// Removing a cache entry failed.
    #[error("failed to remove cache entry {path:?}: {source}")]
    Remove { path: PathBuf, source: io::Error },
    /// Listing the cache root failed.
    #[error("failed to list cache directory {path:?}: {source}")]
    List { path: PathBuf, source: io::Error },
}

/// Failures while acquiring a layer for a location.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AcquireError {
    /// The location was rejected before any I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Downloading the archive failed.
    #[error("failed to download gazetteer data for {location}: {source}")]
    Download {
        location: Location,
        #[source]
        source: TransportError,
    },
    /// The downloaded bytes are not a readable ZIP archive.
    #[error("archive for {location} is malformed: {message}")]
    MalformedArchive { location: Location, message: String },
    /// The expected GeoPackage member is absent from the archive.
    #[error("{member} not found in archive for {location}; archive contains {available:?}")]
    MemberNotFound {
        location: Location,
        /// Member name derived from the location.
        member: String,
        /// Names of every member the archive does hold.
        available: Vec<String>,
    },
    /// The member exists but could not be decompressed.
    #[error("failed to read {member} from archive for {location}: {source}")]
    ReadMember {
        location: Location,
        member: String,
        source: io::Error,
    },
    /// Reading or writing the cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Staging the extracted GeoPackage in temporary storage failed.
    #[error("failed to stage {member} in temporary storage: {source}")]
    Ephemeral { member: String, source: io::Error },
    /// The freshly extracted GeoPackage could not be loaded.
    #[error("failed to load layer {layer} for {location}: {source}")]
    LoadLayer {
        location: Location,
        /// Requested layer, or `<default>`.
        layer: String,
        #[source]
        source: LayerError,
    },
}

impl AcquireError {
    /// Whether the failure was caused by invalid input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Failures while querying the elevation service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ElevationError {
    /// Coordinates or units were rejected before any request.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The response carried no `value` field.
    #[error("no elevation data returned for coordinates ({lat}, {lon})")]
    MissingValue { lat: f64, lon: f64 },
    /// The service reported null or its no-data sentinel.
    #[error(
        "no elevation available for coordinates ({lat}, {lon}); location may be outside coverage or over water"
    )]
    NoData { lat: f64, lon: f64 },
    /// The request itself failed.
    #[error("failed to query elevation service: {source}")]
    Request {
        #[source]
        source: TransportError,
    },
    /// The response body was not the expected JSON shape.
    #[error("failed to parse elevation response: {message}")]
    Decode { message: String },
}

impl ElevationError {
    /// Whether the failure was caused by invalid input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Failures while building an enriched export.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// The location was rejected before any I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The names layer could not be acquired.
    #[error("failed to load names layer for {location}: {source}")]
    Acquire {
        location: Location,
        #[source]
        source: AcquireError,
    },
    /// The history layer could not be acquired.
    #[error("failed to load history layer for {location}: {source}")]
    History {
        location: Location,
        #[source]
        source: AcquireError,
    },
    /// No feature matched the requested classes.
    #[error("no features of class {classes:?} found for {location}")]
    NoMatchingFeatures {
        /// Requested classes, sorted.
        classes: Vec<String>,
        location: Location,
    },
    /// A layer lacked a column the join relies on.
    #[error("layer {layer} has no column {column}")]
    MissingColumn { layer: String, column: String },
    /// Assembling the enriched table failed.
    #[error(transparent)]
    Table(#[from] TableError),
    /// Writing the delimited export failed.
    #[error(transparent)]
    Write(#[from] DelimitedError),
    /// Clearing the cache after the export failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ExportError {
    /// Whether the failure was caused by invalid input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
