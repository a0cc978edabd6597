//! Point elevation lookups against the national elevation point query
//! service.
//!
//! [`ElevationClient`] validates its input, issues one query through an
//! [`ElevationService`], and interprets the JSON reply. A missing `value`
//! field, a `null` value, and the `-1000000` sentinel are all reported as
//! errors, never as a numeric zero. Values are rounded half-to-even.
//!
//! # Examples
//! ```
//! use gnis_core::Units;
//! use gnis_data::{ElevationClient, PointElevation};
//! use gnis_data::test_support::StubElevationService;
//!
//! let client = ElevationClient::new(StubElevationService::with_body(r#"{"value": 14505.3}"#));
//! assert_eq!(client.get_elevation(36.578581, -118.291994, Units::Feet)?, 14505);
//! # Ok::<(), gnis_data::ElevationError>(())
//! ```

use gnis_core::{GnisConfig, LatLon, Units};
use serde_json::Value as Json;
use url::Url;

use crate::http::{BlockingClient, Deadline};
use crate::{ElevationError, TransportError};

/// Value the service returns when it has no data for a point.
pub const NO_DATA_SENTINEL: f64 = -1_000_000.0;

/// Issue one raw point query.
pub trait ElevationService {
    /// Query the elevation at `point` in `units`, returning the response body.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the request fails.
    fn fetch(&self, point: LatLon, units: Units) -> Result<String, TransportError>;
}

impl<S: ElevationService + ?Sized> ElevationService for &S {
    fn fetch(&self, point: LatLon, units: Units) -> Result<String, TransportError> {
        (**self).fetch(point, units)
    }
}

/// Integer elevation for a coordinate pair.
///
/// This is the seam the enrichment pipeline depends on.
pub trait PointElevation {
    /// Elevation at (`lat`, `lon`) rounded to an integer.
    ///
    /// # Errors
    /// Returns [`ElevationError::Validation`] for out-of-range coordinates
    /// and the other variants when the service cannot supply a value.
    fn get_elevation(&self, lat: f64, lon: f64, units: Units) -> Result<i64, ElevationError>;
}

/// HTTP implementation of [`ElevationService`].
#[derive(Debug)]
pub struct HttpElevationService {
    http: BlockingClient,
    endpoint: Url,
}

impl HttpElevationService {
    /// Build a service for the configured endpoint, timeout, and user agent.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] for a malformed endpoint and
    /// [`TransportError::Build`] or [`TransportError::Runtime`] when the
    /// client cannot be constructed.
    pub fn new(config: &GnisConfig) -> Result<Self, TransportError> {
        let endpoint =
            Url::parse(&config.elevation_url).map_err(|source| TransportError::InvalidUrl {
                url: config.elevation_url.clone(),
                source,
            })?;
        Ok(Self {
            http: BlockingClient::new(
                &config.user_agent,
                config.elevation_timeout,
                Deadline::Total,
            )?,
            endpoint,
        })
    }

    pub(crate) fn query_url(&self, point: LatLon, units: Units) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("x", &point.lon().to_string())
            .append_pair("y", &point.lat().to_string())
            .append_pair("units", units.as_str())
            .append_pair("output", "json");
        url
    }

    async fn fetch_async(&self, url: Url) -> Result<String, TransportError> {
        let display = url.to_string();
        self.http
            .client()
            .get(url)
            .send()
            .await
            .map_err(|err| self.http.convert_error(&err, &display))?
            .error_for_status()
            .map_err(|err| self.http.convert_error(&err, &display))?
            .text()
            .await
            .map_err(|err| self.http.convert_error(&err, &display))
    }
}

impl ElevationService for HttpElevationService {
    fn fetch(&self, point: LatLon, units: Units) -> Result<String, TransportError> {
        let url = self.query_url(point, units);
        self.http.block_on(self.fetch_async(url))
    }
}

/// Validating client over an [`ElevationService`].
#[derive(Debug)]
pub struct ElevationClient<S = HttpElevationService> {
    service: S,
}

impl ElevationClient {
    /// A client querying the configured HTTP endpoint.
    ///
    /// # Errors
    /// See [`HttpElevationService::new`].
    pub fn http(config: &GnisConfig) -> Result<Self, TransportError> {
        Ok(Self::new(HttpElevationService::new(config)?))
    }
}

impl<S: ElevationService> ElevationClient<S> {
    /// Wrap `service`.
    #[must_use]
    pub const fn new(service: S) -> Self {
        Self { service }
    }

    /// The wrapped service.
    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }
}

impl<S: ElevationService> PointElevation for ElevationClient<S> {
    fn get_elevation(&self, lat: f64, lon: f64, units: Units) -> Result<i64, ElevationError> {
        let point = LatLon::new(lat, lon)?;
        let body = self
            .service
            .fetch(point, units)
            .map_err(|source| ElevationError::Request { source })?;
        interpret(&body, point)
    }
}

fn decode_error(message: impl Into<String>) -> ElevationError {
    ElevationError::Decode {
        message: message.into(),
    }
}

pub(crate) fn interpret(body: &str, point: LatLon) -> Result<i64, ElevationError> {
    let (lat, lon) = (point.lat(), point.lon());
    let reply: Json = serde_json::from_str(body).map_err(|err| decode_error(err.to_string()))?;
    let object = reply
        .as_object()
        .ok_or_else(|| decode_error(format!("expected a JSON object, got {reply}")))?;
    let raw = object
        .get("value")
        .ok_or(ElevationError::MissingValue { lat, lon })?;
    let value = match raw {
        Json::Null => return Err(ElevationError::NoData { lat, lon }),
        Json::Number(number) => number
            .as_f64()
            .ok_or_else(|| decode_error(format!("value {number} is not representable")))?,
        Json::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|err| decode_error(format!("value {text:?} is not numeric: {err}")))?,
        other => return Err(decode_error(format!("unexpected value {other}"))),
    };
    if value == NO_DATA_SENTINEL || !value.is_finite() {
        return Err(ElevationError::NoData { lat, lon });
    }
    Ok(value.round_ties_even() as i64)
}

#[cfg(test)]
mod tests;
