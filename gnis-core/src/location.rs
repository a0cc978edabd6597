//! Gazetteer locations: a regional code or the national dataset.
//!
//! Input is case-insensitive and canonicalised to uppercase. Every derived
//! name (archive, member, cache file) is a pure function of the canonical
//! form, so `"ca"` and `"CA"` resolve to the same artefacts.
//!
//! # Examples
//! ```
//! use gnis_core::Location;
//!
//! let ca: Location = "ca".parse()?;
//! assert_eq!(ca.code(), "CA");
//! assert_eq!(ca.archive_name(), "Gazetteer_CA_GPKG.zip");
//!
//! let national = Location::parse("usa")?;
//! assert_eq!(national.member_name(), "Gazetteer_National_GPKG.gpkg");
//! # Ok::<(), gnis_core::ValidationError>(())
//! ```

use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::ValidationError;

/// Regional codes published individually: 50 states, DC, and 6 territories.
pub const REGION_CODES: [&str; 57] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC", "AS", "GU", "MP", "PR", "VI", "UM",
];

/// Aliases that select the national dataset.
pub const NATIONAL_ALIASES: [&str; 4] = ["NATIONAL", "ALL", "US", "USA"];

const ARTEFACT_PREFIX: &str = "Gazetteer";
const ARTEFACT_SUFFIX: &str = "GPKG";
const NATIONAL_CODE: &str = "National";

/// A validated gazetteer location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// The entire national dataset.
    National,
    /// A single state or territory, identified by its two-letter code.
    Region(Region),
}

/// Two-letter regional code drawn from [`REGION_CODES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(&'static str);

impl Region {
    /// The uppercase two-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        self.0
    }
}

impl Location {
    /// Normalise and validate a location string.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidLocation`] carrying the uppercase
    /// input when it is neither a regional code nor a national alias.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let canonical = input.to_ascii_uppercase();
        if NATIONAL_ALIASES.contains(&canonical.as_str()) {
            return Ok(Self::National);
        }
        REGION_CODES
            .iter()
            .find(|code| **code == canonical)
            .map(|code| Self::Region(Region(code)))
            .ok_or(ValidationError::InvalidLocation { value: canonical })
    }

    /// Code used inside artefact names: `National` or the regional code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::National => NATIONAL_CODE,
            Self::Region(region) => region.code(),
        }
    }

    /// Whether this location selects the national dataset.
    #[must_use]
    pub const fn is_national(&self) -> bool {
        matches!(self, Self::National)
    }

    /// Base name shared by the archive and its GeoPackage member.
    #[must_use]
    pub fn artefact_stem(&self) -> String {
        format!("{ARTEFACT_PREFIX}_{}_{ARTEFACT_SUFFIX}", self.code())
    }

    /// File name of the downloadable ZIP archive.
    #[must_use]
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.artefact_stem())
    }

    /// Name of the GeoPackage member inside the archive.
    ///
    /// Cache entries reuse this name verbatim.
    #[must_use]
    pub fn member_name(&self) -> String {
        format!("{}.gpkg", self.artefact_stem())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Location {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Fresh copy of the valid regional codes.
///
/// Callers own the returned set; mutating it has no effect on validation.
#[must_use]
pub fn available_locations() -> BTreeSet<&'static str> {
    REGION_CODES.iter().copied().collect()
}
