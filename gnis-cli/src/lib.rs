//! Command-line interface for the GNIS gazetteer engine.
//!
//! Every command prints a JSON document on stdout; progress is logged on
//! stderr through `tracing-subscriber`, filtered by `RUST_LOG`.
#![forbid(unsafe_code)]

mod commands;
mod error;
mod export;

use std::io::Write;

use clap::{Parser, Subcommand};
use gnis_core::GnisConfig;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub use error::CliError;

use commands::{CacheClearArgs, CacheInfoArgs, ElevationArgs, LoadArgs};
use export::ExportArgs;

const ARG_LOCATION: &str = "location";
const ARG_CLASS: &str = "class";
const ARG_LATITUDE: &str = "lat";
const ARG_LONGITUDE: &str = "lon";
const ENV_EXPORT_LOCATION: &str = "GNIS_CMDS_EXPORT_LOCATION";
const ENV_EXPORT_CLASSES: &str = "GNIS_CMDS_EXPORT_CLASSES";
const ENV_LOAD_LOCATION: &str = "GNIS_CMDS_LOAD_LOCATION";
const ENV_ELEVATION_LATITUDE: &str = "GNIS_CMDS_ELEVATION_LAT";
const ENV_ELEVATION_LONGITUDE: &str = "GNIS_CMDS_ELEVATION_LON";

/// Install the stderr log subscriber. Defaults to `info` when `RUST_LOG` is
/// unset; `log` records from the library crates are forwarded.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber installed by an embedding process takes precedence.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the GNIS CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(CliError::ArgumentParsing(err)),
    };
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Export(args) => export::run_export(args, out),
        Command::Load(args) => commands::run_load(args, out),
        Command::Elevation(args) => commands::run_elevation(args, out),
        Command::Cache(CacheCommand::Info(args)) => commands::run_cache_info(&args, out),
        Command::Cache(CacheCommand::Clear(args)) => commands::run_cache_clear(&args, out),
        Command::Locations => commands::run_locations(out),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "gnis",
    about = "Fetch, cache, and enrich USGS geographic names gazetteer data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filter, join, and elevation-annotate one location's features.
    Export(ExportArgs),
    /// Load one layer for a location and summarise it.
    Load(LoadArgs),
    /// Query the elevation of a single point.
    Elevation(ElevationArgs),
    /// Inspect or clear the on-disk cache.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// List the accepted location codes and national aliases.
    Locations,
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Report cached GeoPackages and their sizes.
    Info(CacheInfoArgs),
    /// Delete one location's cache entry, or every entry.
    Clear(CacheClearArgs),
}

/// Defaults with optional service URL overrides applied.
fn service_config(archive_base_url: Option<String>, elevation_url: Option<String>) -> GnisConfig {
    let mut config = GnisConfig::default();
    if let Some(url) = archive_base_url {
        config = config.with_archive_base_url(url);
    }
    if let Some(url) = elevation_url {
        config = config.with_elevation_url(url);
    }
    config
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    out.write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    out.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
