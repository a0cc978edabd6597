//! Elevation units accepted by the point elevation service.
//!
//! # Examples
//! ```
//! use gnis_core::Units;
//!
//! assert_eq!("Meters".parse::<Units>()?, Units::Meters);
//! assert!("feet".parse::<Units>().is_err());
//! # Ok::<(), gnis_core::ValidationError>(())
//! ```

use std::{fmt, str::FromStr};

use crate::ValidationError;

/// Unit of the returned elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Units {
    /// Elevation in feet.
    #[default]
    Feet,
    /// Elevation in metres.
    Meters,
}

impl Units {
    /// Wire name used in service queries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feet => "Feet",
            Self::Meters => "Meters",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = ValidationError;

    /// Match the exact wire names; other spellings are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Feet" => Ok(Self::Feet),
            "Meters" => Ok(Self::Meters),
            other => Err(ValidationError::InvalidUnits {
                value: other.to_owned(),
            }),
        }
    }
}
