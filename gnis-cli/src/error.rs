//! Error types emitted by the GNIS CLI.
//!
//! Library errors are wrapped transparently so their messages reach the user
//! unchanged; only CLI-specific failures get their own wording.

use std::sync::Arc;

use gnis_core::ValidationError;
use gnis_data::{AcquireError, CacheError, ElevationError, ExportError, TransportError};
use thiserror::Error;

/// Errors emitted by the GNIS CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A location, coordinate, or unit was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    BuildClient(#[from] TransportError),
    /// Acquiring a layer failed.
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    /// Building the export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// The elevation lookup failed.
    #[error(transparent)]
    Elevation(#[from] ElevationError),
    /// Inspecting or clearing the cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
