//! `load`, `elevation`, `cache`, and `locations` commands.

use std::{collections::BTreeSet, io::Write};

use camino::Utf8PathBuf;
use clap::{Args, Parser};
use gnis_core::{GnisConfig, Location, NATIONAL_ALIASES, Units, available_locations};
use gnis_data::{
    AcquireOptions, Acquirer, ArchiveReader, ArchiveTransport, CacheStore, ElevationClient,
    LayerReader, PointElevation,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_LATITUDE, ARG_LOCATION, ARG_LONGITUDE, CliError, ENV_ELEVATION_LATITUDE,
    ENV_ELEVATION_LONGITUDE, ENV_LOAD_LOCATION, service_config, write_json,
};

/// CLI arguments for the `load` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Load one layer for a location and summarise it")]
#[ortho_config(prefix = "GNIS")]
pub(crate) struct LoadArgs {
    /// Two-letter state or territory code, or a national alias.
    #[arg(long = ARG_LOCATION, value_name = "code")]
    #[serde(default)]
    pub(crate) location: Option<String>,
    /// Layer to load; the first layer in the GeoPackage when omitted.
    #[arg(long, value_name = "name")]
    #[serde(default)]
    pub(crate) layer: Option<String>,
    /// Read from and write to the on-disk cache.
    #[arg(long)]
    #[serde(default)]
    pub(crate) cache: bool,
    /// Cache directory overriding the per-user default.
    #[arg(long, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// Base URL the archive file name is appended to.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) archive_base_url: Option<String>,
}

/// Resolved `load` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadConfig {
    pub(crate) location: String,
    pub(crate) options: AcquireOptions,
    pub(crate) service: GnisConfig,
}

impl TryFrom<LoadArgs> for LoadConfig {
    type Error = CliError;

    fn try_from(args: LoadArgs) -> Result<Self, Self::Error> {
        let location = args.location.ok_or(CliError::MissingArgument {
            field: ARG_LOCATION,
            env: ENV_LOAD_LOCATION,
        })?;
        let mut options = AcquireOptions::default().with_cache(args.cache);
        options.layer = args.layer;
        options.cache_root = args.cache_dir.map(Utf8PathBuf::into_std_path_buf);
        Ok(Self {
            location,
            options,
            service: service_config(args.archive_base_url, None),
        })
    }
}

#[derive(Debug, Serialize)]
struct LayerSummary<'a> {
    location: &'a str,
    layer: Option<&'a str>,
    features: usize,
    columns: &'a [String],
}

pub(crate) fn run_load(args: LoadArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = LoadConfig::try_from(merged)?;
    let acquirer = Acquirer::http(config.service.clone())?;
    execute_load(&config, &acquirer, out)
}

pub(crate) fn execute_load<T, A, L>(
    config: &LoadConfig,
    acquirer: &Acquirer<T, A, L>,
    out: &mut dyn Write,
) -> Result<(), CliError>
where
    T: ArchiveTransport,
    A: ArchiveReader,
    L: LayerReader,
{
    let table = acquirer.acquire(&config.location, &config.options)?;
    write_json(
        out,
        &LayerSummary {
            location: &config.location,
            layer: config.options.layer.as_deref(),
            features: table.len(),
            columns: table.columns(),
        },
    )
}

/// CLI arguments for the `elevation` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Query the elevation of a single point")]
#[ortho_config(prefix = "GNIS")]
pub(crate) struct ElevationArgs {
    /// Latitude in decimal degrees.
    #[arg(long = ARG_LATITUDE, value_name = "degrees", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude in decimal degrees.
    #[arg(long = ARG_LONGITUDE, value_name = "degrees", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Elevation units: "Feet" or "Meters".
    #[arg(long, value_name = "units")]
    #[serde(default)]
    pub(crate) units: Option<String>,
    /// Elevation point query endpoint.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) elevation_url: Option<String>,
}

/// Resolved `elevation` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElevationConfig {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) units: Units,
    pub(crate) service: GnisConfig,
}

impl TryFrom<ElevationArgs> for ElevationConfig {
    type Error = CliError;

    fn try_from(args: ElevationArgs) -> Result<Self, Self::Error> {
        let lat = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_LATITUDE,
            env: ENV_ELEVATION_LATITUDE,
        })?;
        let lon = args.lon.ok_or(CliError::MissingArgument {
            field: ARG_LONGITUDE,
            env: ENV_ELEVATION_LONGITUDE,
        })?;
        let units = args
            .units
            .as_deref()
            .map(str::parse::<Units>)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            lat,
            lon,
            units,
            service: service_config(None, args.elevation_url),
        })
    }
}

#[derive(Debug, Serialize)]
struct ElevationReport {
    lat: f64,
    lon: f64,
    units: Units,
    elevation: i64,
}

pub(crate) fn run_elevation(args: ElevationArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ElevationConfig::try_from(merged)?;
    let client = ElevationClient::http(&config.service)?;
    execute_elevation(&config, &client, out)
}

pub(crate) fn execute_elevation(
    config: &ElevationConfig,
    client: &dyn PointElevation,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let elevation = client.get_elevation(config.lat, config.lon, config.units)?;
    write_json(
        out,
        &ElevationReport {
            lat: config.lat,
            lon: config.lon,
            units: config.units,
            elevation,
        },
    )
}

/// CLI arguments for `cache info`.
#[derive(Debug, Clone, Args, Default)]
pub(crate) struct CacheInfoArgs {
    /// Cache directory overriding the per-user default.
    #[arg(long, value_name = "dir")]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
}

/// CLI arguments for `cache clear`.
#[derive(Debug, Clone, Args, Default)]
pub(crate) struct CacheClearArgs {
    /// Only remove this location's entry.
    #[arg(long = ARG_LOCATION, value_name = "code")]
    pub(crate) location: Option<String>,
    /// Cache directory overriding the per-user default.
    #[arg(long, value_name = "dir")]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
}

fn cache_store(cache_dir: Option<&Utf8PathBuf>) -> CacheStore {
    CacheStore::resolve(
        &GnisConfig::default(),
        cache_dir.map(|dir| dir.as_std_path()),
    )
}

pub(crate) fn run_cache_info(args: &CacheInfoArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let info = cache_store(args.cache_dir.as_ref()).info()?;
    write_json(out, &info)
}

#[derive(Debug, Serialize)]
struct ClearReport {
    removed: usize,
}

pub(crate) fn run_cache_clear(args: &CacheClearArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let location = args
        .location
        .as_deref()
        .map(Location::parse)
        .transpose()?;
    let removed = cache_store(args.cache_dir.as_ref()).evict(location)?;
    write_json(out, &ClearReport { removed })
}

#[derive(Debug, Serialize)]
struct LocationList {
    regions: BTreeSet<&'static str>,
    national_aliases: [&'static str; 4],
}

pub(crate) fn run_locations(out: &mut dyn Write) -> Result<(), CliError> {
    write_json(
        out,
        &LocationList {
            regions: available_locations(),
            national_aliases: NATIONAL_ALIASES,
        },
    )
}
