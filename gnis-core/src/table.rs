//! Row-oriented tables loaded from GeoPackage layers or delimited exports.
//!
//! A [`Table`] owns an ordered column list and rows of [`Value`]s. Rows are
//! always exactly as wide as the column list; [`Table::push_row`] enforces
//! that invariant.
//!
//! # Examples
//! ```
//! use gnis_core::{Table, Value};
//!
//! let mut table = Table::new(["feature_id", "feature_name"])?;
//! table.push_row(vec![Value::Integer(1), Value::Text("Mount Whitney".into())])?;
//! assert_eq!(table.len(), 1);
//! assert_eq!(
//!     table.value(0, "feature_name").and_then(Value::as_text),
//!     Some("Mount Whitney"),
//! );
//! # Ok::<(), gnis_core::TableError>(())
//! ```

use geo::Point;

use crate::TableError;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Value {
    /// Missing or deliberately absent value.
    Null,
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes, including geometries other than points.
    Blob(Vec<u8>),
    /// Decoded point geometry (`x = longitude`, `y = latitude`).
    Point(Point<f64>),
}

impl Value {
    /// Whether this cell carries no value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Integer payload. Real values are not coerced.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric payload as `f64`; numeric text is parsed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the cell for a delimited text field.
    ///
    /// `Null` renders as an empty field, points as WKT.
    #[must_use]
    pub fn to_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::Text(text) => text.clone(),
            Self::Blob(bytes) => bytes.iter().map(|byte| format!("{byte:02x}")).collect(),
            Self::Point(point) => format!("POINT ({} {})", point.x(), point.y()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered columns and equally wide rows.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the supplied column names.
    ///
    /// # Errors
    /// Returns [`TableError::DuplicateColumn`] when a name repeats.
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for column in columns {
            let name = column.into();
            if names.contains(&name) {
                return Err(TableError::DuplicateColumn { name });
            }
            names.push(name);
        }
        Ok(Self {
            columns: names,
            rows: Vec::new(),
        })
    }

    /// Append a row.
    ///
    /// # Errors
    /// Returns [`TableError::RowWidth`] when the row width differs from the
    /// column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the column list.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell at `row` under column `name`.
    #[must_use]
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row)?.get(index)
    }

    /// Iterate over every cell in column `name`, or `None` if it is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(index)))
    }
}
