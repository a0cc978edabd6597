use gnis_core::{GnisConfig, LatLon, Units, ValidationError};
use rstest::rstest;

use super::*;
use crate::test_support::StubElevationService;

const WHITNEY: (f64, f64) = (36.578_581, -118.291_994);

fn client(body: &str) -> ElevationClient<StubElevationService> {
    ElevationClient::new(StubElevationService::with_body(body))
}

#[rstest]
#[case(r#"{"value": 14505.3}"#, 14505)]
#[case(r#"{"value": 1234.6}"#, 1235)]
#[case(r#"{"value": 1234.4}"#, 1234)]
#[case(r#"{"value": 1234.5}"#, 1234)]
#[case(r#"{"value": 1235.5}"#, 1236)]
#[case(r#"{"value": -85.5}"#, -86)]
#[case(r#"{"value": 0}"#, 0)]
#[case(r#"{"value": "4421.37", "location": {"x": -118.29}}"#, 4421)]
fn rounds_service_values(#[case] body: &str, #[case] expected: i64) {
    let elevation = client(body)
        .get_elevation(WHITNEY.0, WHITNEY.1, Units::Feet)
        .expect("service value should decode");
    assert_eq!(elevation, expected);
}

#[rstest]
#[case(r#"{"value": -1000000}"#)]
#[case(r#"{"value": "-1000000"}"#)]
#[case(r#"{"value": null}"#)]
fn sentinel_and_null_mean_no_data(#[case] body: &str) {
    let err = client(body)
        .get_elevation(WHITNEY.0, WHITNEY.1, Units::Feet)
        .expect_err("no data expected");
    assert!(matches!(err, ElevationError::NoData { .. }), "got {err:?}");
    assert!(!err.is_validation());
}

#[rstest]
fn missing_value_field_is_its_own_error() {
    let err = client(r#"{"location": {}}"#)
        .get_elevation(WHITNEY.0, WHITNEY.1, Units::Feet)
        .expect_err("value is missing");
    assert!(matches!(err, ElevationError::MissingValue { .. }), "got {err:?}");
    assert!(err.to_string().contains("no elevation data returned"));
}

#[rstest]
#[case("not json")]
#[case("[1, 2, 3]")]
#[case(r#"{"value": "high"}"#)]
#[case(r#"{"value": [1]}"#)]
fn unexpected_shapes_are_decode_errors(#[case] body: &str) {
    let err = client(body)
        .get_elevation(WHITNEY.0, WHITNEY.1, Units::Feet)
        .expect_err("body should not decode");
    assert!(matches!(err, ElevationError::Decode { .. }), "got {err:?}");
}

#[rstest]
fn request_failures_are_wrapped() {
    let client = ElevationClient::new(StubElevationService::failing_with_status(503));
    let err = client
        .get_elevation(WHITNEY.0, WHITNEY.1, Units::Meters)
        .expect_err("request should fail");
    assert!(matches!(
        err,
        ElevationError::Request {
            source: TransportError::Http { status: 503, .. }
        }
    ));
}

#[rstest]
#[case(90.1, 0.0, ValidationError::LatitudeOutOfRange { value: 90.1 })]
#[case(-91.0, 0.0, ValidationError::LatitudeOutOfRange { value: -91.0 })]
#[case(0.0, 180.5, ValidationError::LongitudeOutOfRange { value: 180.5 })]
#[case(0.0, -200.0, ValidationError::LongitudeOutOfRange { value: -200.0 })]
fn out_of_range_coordinates_never_reach_the_service(
    #[case] lat: f64,
    #[case] lon: f64,
    #[case] expected: ValidationError,
) {
    let client = client(r#"{"value": 1}"#);
    let err = client
        .get_elevation(lat, lon, Units::Feet)
        .expect_err("coordinates should be rejected");
    assert!(err.is_validation());
    assert!(matches!(err, ElevationError::Validation(ref inner) if *inner == expected));
    assert!(client.service().queries().is_empty());
}

#[rstest]
fn boundary_coordinates_are_accepted() {
    let client = client(r#"{"value": 12}"#);
    assert_eq!(
        client
            .get_elevation(-90.0, 180.0, Units::Meters)
            .expect("boundaries are inclusive"),
        12
    );
    let queries = client.service().queries();
    let (point, units) = queries.first().expect("one query");
    assert_eq!((point.lat(), point.lon()), (-90.0, 180.0));
    assert_eq!(*units, Units::Meters);
}

#[rstest]
fn query_url_carries_point_units_and_format() {
    let service = HttpElevationService::new(
        &GnisConfig::default().with_elevation_url("https://epqs.example.test/v1/json"),
    )
    .expect("service should build");
    let point = LatLon::new(WHITNEY.0, WHITNEY.1).expect("valid point");

    let url = service.query_url(point, Units::Feet);

    assert_eq!(
        url.as_str(),
        "https://epqs.example.test/v1/json?x=-118.291994&y=36.578581&units=Feet&output=json"
    );
}

#[rstest]
fn malformed_endpoints_are_rejected() {
    let err = HttpElevationService::new(&GnisConfig::default().with_elevation_url("not a url"))
        .expect_err("endpoint should be rejected");
    assert!(matches!(err, TransportError::InvalidUrl { .. }), "got {err:?}");
}
