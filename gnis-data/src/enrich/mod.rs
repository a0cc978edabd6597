//! Filter, join, and elevation-annotate gazetteer features for export.
//!
//! [`ExportPipeline::build_export`] loads the names and history layers for a
//! location through the cache, keeps the features whose class was
//! requested, left-joins their history, renames the result to the public
//! schema, and optionally adds an elevation column. Elevation lookups run
//! one at a time with a pause between consecutive requests; a failed lookup
//! leaves a null cell and the batch carries on.
//!
//! # Examples
//! ```
//! use gnis_core::{GnisConfig, Location};
//! use gnis_data::{Acquirer, ExportOptions, ExportPipeline};
//! use gnis_data::test_support::{GazetteerFixture, RecordingPacer, StubElevation, StubTransport};
//!
//! let cache = tempfile::tempdir()?;
//! let archive = GazetteerFixture::sample().archive_for(Location::parse("CA")?)?;
//! let transport = StubTransport::with_archive(archive);
//! let acquirer = Acquirer::new(GnisConfig::default().with_cache_root(cache.path()), &transport);
//! let elevation = StubElevation::returning([Some(14505), Some(14375), Some(14246)]);
//! let pacer = RecordingPacer::default();
//!
//! let pipeline = ExportPipeline::new(&acquirer, &elevation, &pacer);
//! let table = pipeline.build_export("CA", &ExportOptions::new(["Summit"]).with_elevation(true))?;
//! assert_eq!(table.len(), 3);
//! assert_eq!(pacer.pause_count(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod join;

use std::{collections::BTreeSet, path::PathBuf, thread, time::Duration};

use camino::Utf8PathBuf;
use gnis_core::{Location, Table, Units, Value};
use log::{info, warn};

use crate::acquire::{AcquireOptions, Acquirer, ArchiveReader, ArchiveTransport};
use crate::delimited::write_delimited;
use crate::elevation::PointElevation;
use crate::gpkg::LayerReader;
use crate::ExportError;

use join::HistoryIndex;

/// Layer holding one row per named feature.
pub const NAMES_LAYER: &str = "DomesticNames";

/// Layer holding descriptions and history narratives.
pub const HISTORY_LAYER: &str = "FeatureDescriptionHistory";

/// Names-layer columns carried into the export and their public names.
const NAME_COLUMNS: [(&str, &str); 7] = [
    ("feature_id", "feature_id"),
    ("feature_name", "feature_name"),
    ("feature_class", "feature_class"),
    ("state_name", "state_name"),
    ("county_name", "county_name"),
    ("prim_lat_dec", "latitude"),
    ("prim_long_dec", "longitude"),
];

const FEATURE_ID: &str = "feature_id";
const FEATURE_CLASS: &str = "feature_class";
const FEATURE_ID_POSITION: usize = 0;
const LATITUDE: usize = 5;
const LONGITUDE: usize = 6;

/// Joined description and history text.
pub const DESCRIPTION_HISTORY_COLUMN: &str = "description_history";

/// Integer elevation, present when elevation lookups were requested.
pub const ELEVATION_COLUMN: &str = "elevation";

/// Public column names in export order.
#[must_use]
pub fn export_columns(add_elevation: bool) -> Vec<&'static str> {
    let mut columns: Vec<_> = NAME_COLUMNS.iter().map(|(_, public)| *public).collect();
    columns.push(DESCRIPTION_HISTORY_COLUMN);
    if add_elevation {
        columns.push(ELEVATION_COLUMN);
    }
    columns
}

/// Waits between consecutive elevation requests.
pub trait Pacer {
    /// Block for `duration`.
    fn pause(&self, duration: Duration);
}

/// [`Pacer`] that sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Options for [`ExportPipeline::build_export`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Feature classes to keep, matched exactly.
    pub feature_classes: BTreeSet<String>,
    /// Add an elevation column.
    pub add_elevation: bool,
    /// Upper bound on elevation requests; unbounded when `None`.
    pub max_elevation_requests: Option<usize>,
    /// Units for elevation lookups.
    pub elevation_units: Units,
    /// Cache root overriding the configured default.
    pub cache_dir: Option<PathBuf>,
    /// Evict the location's cache entry once the table is built.
    pub clear_cache_after: bool,
    /// Write the table here as pipe-delimited text.
    pub output_path: Option<Utf8PathBuf>,
}

impl ExportOptions {
    /// Keep features of the given classes; everything else off.
    #[must_use]
    pub fn new<I, S>(feature_classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feature_classes: feature_classes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Enable or disable elevation lookups.
    #[must_use]
    pub const fn with_elevation(mut self, add_elevation: bool) -> Self {
        self.add_elevation = add_elevation;
        self
    }

    /// Cap the number of elevation requests.
    #[must_use]
    pub const fn with_max_elevation_requests(mut self, limit: usize) -> Self {
        self.max_elevation_requests = Some(limit);
        self
    }

    /// Query elevations in `units`.
    #[must_use]
    pub const fn with_elevation_units(mut self, units: Units) -> Self {
        self.elevation_units = units;
        self
    }

    /// Use `dir` as the cache root.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Evict the cache entry after building.
    #[must_use]
    pub const fn with_clear_cache_after(mut self, clear: bool) -> Self {
        self.clear_cache_after = clear;
        self
    }

    /// Write the export to `path`.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    fn sorted_classes(&self) -> Vec<String> {
        self.feature_classes.iter().cloned().collect()
    }
}

/// Builds enriched export tables.
pub struct ExportPipeline<'a, T, A, L> {
    acquirer: &'a Acquirer<T, A, L>,
    elevation: &'a dyn PointElevation,
    pacer: &'a dyn Pacer,
}

impl<'a, T, A, L> ExportPipeline<'a, T, A, L>
where
    T: ArchiveTransport,
    A: ArchiveReader,
    L: LayerReader,
{
    /// Combine an acquirer, an elevation source, and a pacer.
    #[must_use]
    pub const fn new(
        acquirer: &'a Acquirer<T, A, L>,
        elevation: &'a dyn PointElevation,
        pacer: &'a dyn Pacer,
    ) -> Self {
        Self {
            acquirer,
            elevation,
            pacer,
        }
    }

    /// Build the enriched table for `location`.
    ///
    /// Both layers are acquired with caching enabled, so the second
    /// acquisition reuses the first download. When `output_path` is set the
    /// table is written before the cache is cleared.
    ///
    /// # Errors
    /// Returns [`ExportError::Validation`] for an unknown location,
    /// [`ExportError::Acquire`] or [`ExportError::History`] when a layer
    /// cannot be loaded, [`ExportError::NoMatchingFeatures`] when the class
    /// filter keeps nothing, and the remaining variants for schema, write,
    /// and cache failures. Elevation failures never surface here.
    pub fn build_export(
        &self,
        location: &str,
        options: &ExportOptions,
    ) -> Result<Table, ExportError> {
        let location = Location::parse(location)?;
        let acquire = AcquireOptions {
            layer: None,
            use_cache: true,
            cache_root: options.cache_dir.clone(),
        };

        let names = self
            .acquirer
            .acquire_location(location, &acquire.clone().with_layer(NAMES_LAYER))
            .map_err(|source| ExportError::Acquire { location, source })?;
        let history = self
            .acquirer
            .acquire_location(location, &acquire.clone().with_layer(HISTORY_LAYER))
            .map_err(|source| ExportError::History { location, source })?;

        let selected = select_rows(&names, &options.feature_classes)?;
        if selected.is_empty() {
            return Err(ExportError::NoMatchingFeatures {
                classes: options.sorted_classes(),
                location,
            });
        }
        info!(
            "kept {} of {} features for {location}",
            selected.len(),
            names.len()
        );

        let index = HistoryIndex::build(&history)?;
        let mut rows = project_rows(&names, &selected, &index)?;
        if options.add_elevation {
            self.annotate_elevation(&mut rows, options);
        }

        let mut table = Table::new(export_columns(options.add_elevation))?;
        for row in rows {
            table.push_row(row)?;
        }

        if let Some(path) = &options.output_path {
            write_delimited(&table, path)?;
        }
        if options.clear_cache_after {
            let removed = self.acquirer.cache_store(&acquire).evict(Some(location))?;
            info!("cleared {removed} cache entries for {location}");
        }
        Ok(table)
    }

    fn annotate_elevation(&self, rows: &mut [Vec<Value>], options: &ExportOptions) {
        let attempts = options
            .max_elevation_requests
            .map_or(rows.len(), |limit| limit.min(rows.len()));
        let pause = self.acquirer.config().rate_limit_pause;
        info!("fetching elevation for {attempts} of {} features", rows.len());

        for (position, row) in rows.iter_mut().enumerate() {
            if position >= attempts {
                row.push(Value::Null);
                continue;
            }
            if position > 0 {
                self.pacer.pause(pause);
            }
            let lat = row[LATITUDE].as_f64().unwrap_or(f64::NAN);
            let lon = row[LONGITUDE].as_f64().unwrap_or(f64::NAN);
            let elevation = match self.elevation.get_elevation(lat, lon, options.elevation_units) {
                Ok(elevation) => Value::Integer(elevation),
                Err(err) => {
                    warn!("no elevation for feature {}: {err}", row[FEATURE_ID_POSITION].to_field());
                    Value::Null
                }
            };
            row.push(elevation);
        }
    }
}

fn column(table: &Table, layer: &str, name: &str) -> Result<usize, ExportError> {
    table
        .column_index(name)
        .ok_or_else(|| ExportError::MissingColumn {
            layer: layer.to_owned(),
            column: name.to_owned(),
        })
}

fn select_rows(names: &Table, classes: &BTreeSet<String>) -> Result<Vec<usize>, ExportError> {
    let class_index = column(names, NAMES_LAYER, FEATURE_CLASS)?;
    Ok(names
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row[class_index]
                .as_text()
                .is_some_and(|class| classes.contains(class))
        })
        .map(|(position, _)| position)
        .collect())
}

fn project_rows(
    names: &Table,
    selected: &[usize],
    history: &HistoryIndex,
) -> Result<Vec<Vec<Value>>, ExportError> {
    let sources = NAME_COLUMNS
        .iter()
        .map(|(source, _)| column(names, NAMES_LAYER, source))
        .collect::<Result<Vec<_>, _>>()?;
    let id_index = column(names, NAMES_LAYER, FEATURE_ID)?;

    Ok(selected
        .iter()
        .map(|&position| {
            let row = &names.rows()[position];
            let mut projected: Vec<Value> =
                sources.iter().map(|&index| row[index].clone()).collect();
            projected.push(Value::Text(history.joined_text(&row[id_index])));
            projected
        })
        .collect())
}

#[cfg(test)]
mod tests;
