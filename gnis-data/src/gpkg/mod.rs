//! Reading named layers from GeoPackage files.
//!
//! A GeoPackage is an SQLite database. Layers are the tables registered in
//! `gpkg_contents`; the default layer is the first one registered. Columns
//! registered in `gpkg_geometry_columns` hold geometry blobs, of which points
//! are decoded into [`geo::Point`] values.

mod geometry;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use gnis_core::{Table, TableError, Value};
use log::debug;
use rusqlite::{Connection, OpenFlags, types::ValueRef};
use thiserror::Error;

use geometry::Decoded;

/// Failures while reading a layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayerError {
    /// SQLite could not open or query the file.
    #[error("failed to read GeoPackage {path:?} ({operation}): {source}")]
    Sqlite {
        path: PathBuf,
        /// Step that failed.
        operation: &'static str,
        source: rusqlite::Error,
    },
    /// The database carries no `gpkg_contents` table.
    #[error("{path:?} is not a GeoPackage")]
    NotAGeoPackage { path: PathBuf },
    /// `gpkg_contents` registers no layers.
    #[error("GeoPackage {path:?} contains no layers")]
    NoLayers { path: PathBuf },
    /// The requested layer is not registered.
    #[error("layer {layer} not found in {path:?}; available layers: {available:?}")]
    UnknownLayer {
        path: PathBuf,
        layer: String,
        available: Vec<String>,
    },
    /// The layer's rows could not be assembled into a table.
    #[error("failed to assemble layer {layer}: {source}")]
    Table { layer: String, source: TableError },
}

/// Load one layer of a multi-layer file into a [`Table`].
pub trait LayerReader {
    /// Read `layer` from `path`, or the default layer when `layer` is `None`.
    ///
    /// # Errors
    /// Returns [`LayerError`] when the file cannot be parsed or the layer
    /// does not exist.
    fn read_layer(&self, path: &Path, layer: Option<&str>) -> Result<Table, LayerError>;
}

impl<L: LayerReader + ?Sized> LayerReader for &L {
    fn read_layer(&self, path: &Path, layer: Option<&str>) -> Result<Table, LayerError> {
        (**self).read_layer(path, layer)
    }
}

/// [`LayerReader`] for GeoPackage files, opened read-only through `rusqlite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoPackageReader;

impl GeoPackageReader {
    /// Layer names registered in `path`, in registration order.
    ///
    /// # Errors
    /// Returns [`LayerError`] when the file is not a readable GeoPackage.
    pub fn layers(path: &Path) -> Result<Vec<String>, LayerError> {
        let connection = open(path)?;
        layer_names(&connection, path)
    }
}

impl LayerReader for GeoPackageReader {
    fn read_layer(&self, path: &Path, layer: Option<&str>) -> Result<Table, LayerError> {
        let connection = open(path)?;
        let available = layer_names(&connection, path)?;
        let name = match layer {
            Some(requested) if available.iter().any(|name| name == requested) => requested,
            Some(requested) => {
                return Err(LayerError::UnknownLayer {
                    path: path.to_path_buf(),
                    layer: requested.to_owned(),
                    available,
                });
            }
            None => available
                .first()
                .map(String::as_str)
                .ok_or_else(|| LayerError::NoLayers {
                    path: path.to_path_buf(),
                })?,
        };
        let geometry = geometry_columns(&connection, path, name)?;
        let table = read_rows(&connection, path, name, &geometry)?;
        debug!("read {} rows from layer {name} of {}", table.len(), path.display());
        Ok(table)
    }
}

fn open(path: &Path) -> Result<Connection, LayerError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(sqlite_error(path, "open"))
}

fn sqlite_error<'a>(
    path: &'a Path,
    operation: &'static str,
) -> impl FnOnce(rusqlite::Error) -> LayerError + 'a {
    move |source| LayerError::Sqlite {
        path: path.to_path_buf(),
        operation,
        source,
    }
}

fn has_table(connection: &Connection, path: &Path, table: &str) -> Result<bool, LayerError> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .map_err(sqlite_error(path, "inspect schema"))
}

fn layer_names(connection: &Connection, path: &Path) -> Result<Vec<String>, LayerError> {
    if !has_table(connection, path, "gpkg_contents")? {
        return Err(LayerError::NotAGeoPackage {
            path: path.to_path_buf(),
        });
    }
    let mut statement = connection
        .prepare("SELECT table_name FROM gpkg_contents ORDER BY rowid")
        .map_err(sqlite_error(path, "list layers"))?;
    let names = statement
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sqlite_error(path, "list layers"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sqlite_error(path, "list layers"))?;
    Ok(names)
}

fn geometry_columns(
    connection: &Connection,
    path: &Path,
    layer: &str,
) -> Result<HashSet<String>, LayerError> {
    if !has_table(connection, path, "gpkg_geometry_columns")? {
        return Ok(HashSet::new());
    }
    let mut statement = connection
        .prepare("SELECT column_name FROM gpkg_geometry_columns WHERE table_name = ?1")
        .map_err(sqlite_error(path, "list geometry columns"))?;
    let columns = statement
        .query_map([layer], |row| row.get::<_, String>(0))
        .map_err(sqlite_error(path, "list geometry columns"))?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(sqlite_error(path, "list geometry columns"))?;
    Ok(columns)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn read_rows(
    connection: &Connection,
    path: &Path,
    layer: &str,
    geometry: &HashSet<String>,
) -> Result<Table, LayerError> {
    let sql = format!("SELECT * FROM {}", quote_identifier(layer));
    let mut statement = connection
        .prepare(&sql)
        .map_err(sqlite_error(path, "prepare layer query"))?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let is_geometry: Vec<bool> = columns
        .iter()
        .map(|column| geometry.contains(column))
        .collect();
    let mut table = Table::new(columns).map_err(|source| LayerError::Table {
        layer: layer.to_owned(),
        source,
    })?;

    let mut rows = statement
        .query([])
        .map_err(sqlite_error(path, "query layer"))?;
    while let Some(row) = rows.next().map_err(sqlite_error(path, "read row"))? {
        let mut values = Vec::with_capacity(is_geometry.len());
        for (index, geometry_column) in is_geometry.iter().enumerate() {
            let cell = row
                .get_ref(index)
                .map_err(sqlite_error(path, "read cell"))?;
            values.push(to_value(cell, *geometry_column));
        }
        table.push_row(values).map_err(|source| LayerError::Table {
            layer: layer.to_owned(),
            source,
        })?;
    }
    Ok(table)
}

fn to_value(cell: ValueRef<'_>, geometry_column: bool) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) if geometry_column => match geometry::decode(bytes) {
            Decoded::Point(point) => Value::Point(point),
            Decoded::Empty => Value::Null,
            Decoded::Other => Value::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}
