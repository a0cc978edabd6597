//! Export command implementation for the GNIS CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use gnis_core::{GnisConfig, Units};
use gnis_data::{
    Acquirer, ArchiveReader, ArchiveTransport, ElevationClient, ExportOptions, ExportPipeline,
    LayerReader, Pacer, PointElevation, ThreadSleep,
};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CLASS, ARG_LOCATION, CliError, ENV_EXPORT_CLASSES, ENV_EXPORT_LOCATION, service_config,
    write_json,
};

/// CLI arguments for the `export` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Download (or reuse from the cache) the gazetteer for one \
                 location, keep the requested feature classes, join their \
                 description and history, and optionally look up each \
                 feature's elevation. The table can be written as \
                 pipe-delimited text.",
    about = "Build an enriched export for one location"
)]
#[ortho_config(prefix = "GNIS")]
pub(crate) struct ExportArgs {
    /// Two-letter state or territory code, or a national alias.
    #[arg(long = ARG_LOCATION, value_name = "code")]
    #[serde(default)]
    pub(crate) location: Option<String>,
    /// Feature class to keep (e.g. "Summit"); repeat for several.
    #[arg(long = ARG_CLASS, value_name = "class")]
    #[serde(default)]
    pub(crate) classes: Option<Vec<String>>,
    /// Look up the elevation of each kept feature.
    #[arg(long)]
    #[serde(default)]
    pub(crate) elevation: bool,
    /// Stop querying elevations after this many requests.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) max_elevation_requests: Option<usize>,
    /// Elevation units: "Feet" or "Meters".
    #[arg(long, value_name = "units")]
    #[serde(default)]
    pub(crate) units: Option<String>,
    /// Cache directory overriding the per-user default.
    #[arg(long, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// Remove the location's cache entry once the export is built.
    #[arg(long)]
    #[serde(default)]
    pub(crate) clear_cache: bool,
    /// Write the table here as pipe-delimited text.
    #[arg(long, short = 'o', value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Base URL the archive file name is appended to.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) archive_base_url: Option<String>,
    /// Elevation point query endpoint.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) elevation_url: Option<String>,
}

impl ExportArgs {
    pub(crate) fn into_config(self) -> Result<ExportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExportConfig::try_from(merged)
    }
}

/// Resolved `export` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExportConfig {
    /// Location as given; validated by the pipeline.
    pub(crate) location: String,
    pub(crate) options: ExportOptions,
    pub(crate) service: GnisConfig,
}

impl TryFrom<ExportArgs> for ExportConfig {
    type Error = CliError;

    fn try_from(args: ExportArgs) -> Result<Self, Self::Error> {
        let location = args.location.ok_or(CliError::MissingArgument {
            field: ARG_LOCATION,
            env: ENV_EXPORT_LOCATION,
        })?;
        let classes = args
            .classes
            .filter(|classes| !classes.is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_CLASS,
                env: ENV_EXPORT_CLASSES,
            })?;
        let units = args
            .units
            .as_deref()
            .map(str::parse::<Units>)
            .transpose()?
            .unwrap_or_default();

        let mut options = ExportOptions::new(classes)
            .with_elevation(args.elevation)
            .with_elevation_units(units)
            .with_clear_cache_after(args.clear_cache);
        options.max_elevation_requests = args.max_elevation_requests;
        options.cache_dir = args.cache_dir.map(Utf8PathBuf::into_std_path_buf);
        options.output_path = args.output;

        Ok(Self {
            location,
            options,
            service: service_config(args.archive_base_url, args.elevation_url),
        })
    }
}

/// What `export` prints on success.
#[derive(Debug, Serialize)]
struct ExportSummary<'a> {
    location: &'a str,
    features: usize,
    columns: &'a [String],
    output: Option<&'a Utf8PathBuf>,
}

pub(crate) fn run_export(args: ExportArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let acquirer = Acquirer::http(config.service.clone())?;
    let elevation = ElevationClient::http(&config.service)?;
    execute_export(&config, &acquirer, &elevation, &ThreadSleep, out)
}

pub(crate) fn execute_export<T, A, L>(
    config: &ExportConfig,
    acquirer: &Acquirer<T, A, L>,
    elevation: &dyn PointElevation,
    pacer: &dyn Pacer,
    out: &mut dyn Write,
) -> Result<(), CliError>
where
    T: ArchiveTransport,
    A: ArchiveReader,
    L: LayerReader,
{
    let table = ExportPipeline::new(acquirer, elevation, pacer)
        .build_export(&config.location, &config.options)?;
    if let Some(path) = &config.options.output_path {
        info!("export for {} written to {path}", config.location);
    }
    write_json(
        out,
        &ExportSummary {
            location: &config.location,
            features: table.len(),
            columns: table.columns(),
            output: config.options.output_path.as_ref(),
        },
    )
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExportConfig, CliError> {
    let merged = ExportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExportConfig::try_from(merged)
}
