//! Pipe-delimited text export of [`Table`]s.
//!
//! Files are UTF-8 with a header row, `|` between fields, one line per row,
//! and no index column. Null cells are written as empty fields and read
//! back as [`Value::Null`]; every other field is read back as text.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, WriterBuilder};
use gnis_core::{Table, TableError, Value};
use log::info;
use thiserror::Error;

/// Field delimiter used by exports.
pub const DELIMITER: u8 = b'|';

/// Failures while writing or reading a delimited file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DelimitedError {
    /// The file could not be created or opened.
    #[error("failed to open {path}: {source}")]
    Open { path: Utf8PathBuf, source: io::Error },
    /// Encoding or decoding a record failed.
    #[error("failed to process records in {path}: {source}")]
    Records { path: Utf8PathBuf, source: csv::Error },
    /// The file's rows do not form a valid table.
    #[error("{path} does not hold a valid table: {source}")]
    Table { path: Utf8PathBuf, source: TableError },
}

/// Write `table` to `path`, replacing any existing file.
///
/// # Errors
/// Returns [`DelimitedError`] when the file cannot be created or written.
pub fn write_delimited(table: &Table, path: &Utf8Path) -> Result<(), DelimitedError> {
    let records_error = |source| DelimitedError::Records {
        path: path.to_owned(),
        source,
    };
    let file = gnis_fs::create_file(path).map_err(|source| DelimitedError::Open {
        path: path.to_owned(),
        source,
    })?;
    let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_writer(file);
    writer.write_record(table.columns()).map_err(records_error)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(Value::to_field))
            .map_err(records_error)?;
    }
    writer.flush().map_err(|source| DelimitedError::Records {
        path: path.to_owned(),
        source: source.into(),
    })?;
    info!("wrote {} rows to {path}", table.len());
    Ok(())
}

/// Read a file written by [`write_delimited`].
///
/// # Errors
/// Returns [`DelimitedError`] when the file cannot be read or its rows are
/// ragged.
pub fn read_delimited(path: &Utf8Path) -> Result<Table, DelimitedError> {
    let records_error = |source| DelimitedError::Records {
        path: path.to_owned(),
        source,
    };
    let table_error = |source| DelimitedError::Table {
        path: path.to_owned(),
        source,
    };
    let file = gnis_fs::open_file(path).map_err(|source| DelimitedError::Open {
        path: path.to_owned(),
        source,
    })?;
    let mut reader = ReaderBuilder::new().delimiter(DELIMITER).from_reader(file);
    let headers = reader.headers().map_err(records_error)?.clone();
    let mut table = Table::new(headers.iter()).map_err(table_error)?;
    for record in reader.records() {
        let record = record.map_err(records_error)?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::from(field)
                }
            })
            .collect();
        table.push_row(row).map_err(table_error)?;
    }
    Ok(table)
}
