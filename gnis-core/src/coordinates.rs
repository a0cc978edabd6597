use geo::Point;

use crate::ValidationError;

/// A WGS84 latitude/longitude pair checked against the valid ranges.
///
/// # Examples
/// ```
/// use gnis_core::LatLon;
///
/// let whitney = LatLon::new(36.578581, -118.291994)?;
/// assert_eq!(whitney.to_point().x(), -118.291994);
/// assert!(LatLon::new(91.0, 0.0).is_err());
/// # Ok::<(), gnis_core::ValidationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

impl LatLon {
    /// Validate and construct a coordinate pair.
    ///
    /// Bounds are inclusive; `NaN` is rejected by both checks.
    ///
    /// # Errors
    /// Returns [`ValidationError::LatitudeOutOfRange`] or
    /// [`ValidationError::LongitudeOutOfRange`] citing the offending value.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange { value: lon });
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.lon
    }

    /// Convert to a `geo` point with `x = longitude`, `y = latitude`.
    #[must_use]
    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}
