use thiserror::Error;

/// Input rejected before any I/O takes place.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The location is neither a known regional code nor a national alias.
    #[error("invalid location: {value}. Must be 'National' or a valid state code.")]
    InvalidLocation {
        /// Canonicalised (uppercase) form of the rejected input.
        value: String,
    },
    /// Latitude outside the inclusive range `[-90, 90]`.
    #[error("latitude must be between -90 and 90, got {value}")]
    LatitudeOutOfRange { value: f64 },
    /// Longitude outside the inclusive range `[-180, 180]`.
    #[error("longitude must be between -180 and 180, got {value}")]
    LongitudeOutOfRange { value: f64 },
    /// Elevation units other than `Feet` or `Meters`.
    #[error("units must be 'Feet' or 'Meters', got {value}")]
    InvalidUnits { value: String },
}

/// Errors raised while assembling a [`crate::Table`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A row did not carry one value per column.
    #[error("row has {actual} values but the table has {expected} columns")]
    RowWidth { expected: usize, actual: usize },
    /// Two columns share a name.
    #[error("duplicate column name {name:?}")]
    DuplicateColumn { name: String },
}
