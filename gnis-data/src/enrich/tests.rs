use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use gnis_core::{GnisConfig, Location, Table, Value};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::test_support::{
    GazetteerFixture, NameRecord, RecordingPacer, StubElevation, StubTransport,
};
use crate::{AcquireError, GeoPackageReader, LayerError, ZipArchiveReader, read_delimited};

const ENTRY: &str = "Gazetteer_CA_GPKG.gpkg";

struct Harness {
    dir: TempDir,
    transport: StubTransport,
    pacer: RecordingPacer,
}

impl Harness {
    fn serving(fixture: &GazetteerFixture) -> Self {
        let location = Location::parse("CA").expect("valid location");
        let archive = fixture.archive_for(location).expect("build fixture archive");
        Self {
            dir: TempDir::new().expect("create temp directory"),
            transport: StubTransport::with_archive(archive),
            pacer: RecordingPacer::default(),
        }
    }

    fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn output(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf-8 temp dir")
    }

    fn acquirer(&self) -> Acquirer<&StubTransport> {
        Acquirer::new(
            GnisConfig::default().with_cache_root(self.cache_root()),
            &self.transport,
        )
    }

    fn export(
        &self,
        elevation: &StubElevation,
        options: &ExportOptions,
    ) -> Result<Table, ExportError> {
        let acquirer = self.acquirer();
        ExportPipeline::new(&acquirer, elevation, &self.pacer).build_export("CA", options)
    }
}

#[fixture]
fn sample() -> Harness {
    Harness::serving(&GazetteerFixture::sample())
}

fn summits() -> ExportOptions {
    ExportOptions::new(["Summit"])
}

fn names(table: &Table) -> Vec<&str> {
    table
        .column("feature_name")
        .expect("feature_name column")
        .filter_map(Value::as_text)
        .collect()
}

#[rstest]
fn keeps_only_requested_classes_in_source_order(sample: Harness) {
    let table = sample
        .export(&StubElevation::default(), &ExportOptions::new(["Summit", "Lake"]))
        .expect("export builds");

    assert_eq!(
        names(&table),
        ["Mount Whitney", "Mount Williamson", "White Mountain Peak", "Owens Lake"]
    );
    assert!(
        table
            .column("feature_class")
            .expect("feature_class column")
            .all(|class| matches!(class.as_text(), Some("Summit" | "Lake")))
    );
}

#[rstest]
fn columns_follow_the_public_schema(sample: Harness) {
    let table = sample
        .export(&StubElevation::default(), &summits())
        .expect("export builds");
    assert_eq!(table.columns(), export_columns(false));
    assert_eq!(
        table.value(0, "latitude").and_then(Value::as_f64),
        Some(36.578_581)
    );
    assert_eq!(table.value(0, "feature_id"), Some(&Value::Integer(255_311)));
}

#[rstest]
fn zero_matches_name_the_classes_and_location(sample: Harness) {
    let err = sample
        .export(&StubElevation::default(), &ExportOptions::new(["summit", "Glacier"]))
        .expect_err("class match is case-sensitive");
    match &err {
        ExportError::NoMatchingFeatures { classes, location } => {
            assert_eq!(classes, &["Glacier", "summit"]);
            assert_eq!(location.code(), "CA");
        }
        other => panic!("expected NoMatchingFeatures, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("Glacier") && message.contains("CA"), "{message}");
}

#[rstest]
fn history_is_joined_or_left_empty(sample: Harness) {
    let table = sample
        .export(&StubElevation::default(), &summits())
        .expect("export builds");
    let joined: Vec<_> = table
        .column(DESCRIPTION_HISTORY_COLUMN)
        .expect("joined column")
        .map(|value| value.as_text().expect("joined text is never null"))
        .collect();
    assert_eq!(
        joined,
        [
            "Description: Highest summit in the contiguous United States; \
             History: Named in 1864 for Josiah Whitney",
            "",
            "Description: Highest point of the White Mountains; History: ",
        ]
    );
}

#[rstest]
fn both_layers_share_one_download(sample: Harness) {
    sample
        .export(&StubElevation::default(), &summits())
        .expect("export builds");
    assert_eq!(sample.transport.download_count(), 1);
    assert!(sample.cache_root().join(ENTRY).is_file());
}

#[rstest]
fn invalid_locations_are_rejected_before_any_download(sample: Harness) {
    let acquirer = sample.acquirer();
    let elevation = StubElevation::default();
    let err = ExportPipeline::new(&acquirer, &elevation, &sample.pacer)
        .build_export("Atlantis", &summits())
        .expect_err("location is invalid");
    assert!(err.is_validation());
    assert_eq!(sample.transport.download_count(), 0);
}

#[rstest]
fn names_layer_failures_are_acquire_errors() {
    let harness = Harness::serving(&GazetteerFixture::sample());
    let transport = StubTransport::offline();
    let acquirer = Acquirer::new(
        GnisConfig::default().with_cache_root(harness.cache_root()),
        &transport,
    );
    let elevation = StubElevation::default();
    let err = ExportPipeline::new(&acquirer, &elevation, &harness.pacer)
        .build_export("CA", &summits())
        .expect_err("download fails");
    assert!(
        matches!(
            err,
            ExportError::Acquire {
                source: AcquireError::Download { .. },
                ..
            }
        ),
        "got {err:?}"
    );
}

/// Reads names normally but never finds the history layer.
struct NoHistory;

impl LayerReader for NoHistory {
    fn read_layer(&self, path: &Path, layer: Option<&str>) -> Result<Table, LayerError> {
        if layer == Some(HISTORY_LAYER) {
            return Err(LayerError::UnknownLayer {
                path: path.to_path_buf(),
                layer: HISTORY_LAYER.to_owned(),
                available: vec![NAMES_LAYER.to_owned()],
            });
        }
        GeoPackageReader.read_layer(path, layer)
    }
}

#[rstest]
fn history_failures_are_reported_distinctly(sample: Harness) {
    let acquirer = Acquirer::with_readers(
        GnisConfig::default().with_cache_root(sample.cache_root()),
        &sample.transport,
        ZipArchiveReader,
        NoHistory,
    );
    let elevation = StubElevation::default();
    let err = ExportPipeline::new(&acquirer, &elevation, &sample.pacer)
        .build_export("CA", &summits())
        .expect_err("history layer is missing");
    assert!(matches!(err, ExportError::History { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("failed to load history layer"));
}

#[rstest]
fn elevation_is_fetched_per_row_with_pauses_between(sample: Harness) {
    let elevation = StubElevation::returning([Some(14_505), Some(14_375), Some(14_246)]);
    let table = sample
        .export(&elevation, &summits().with_elevation(true))
        .expect("export builds");

    assert_eq!(table.columns(), export_columns(true));
    let values: Vec<_> = table
        .column(ELEVATION_COLUMN)
        .expect("elevation column")
        .cloned()
        .collect();
    assert_eq!(
        values,
        [
            Value::Integer(14_505),
            Value::Integer(14_375),
            Value::Integer(14_246)
        ]
    );
    assert_eq!(elevation.call_count(), 3);
    assert_eq!(elevation.calls()[0], (36.578_581, -118.291_994));
    assert_eq!(
        sample.pacer.pauses(),
        [Duration::from_millis(100), Duration::from_millis(100)]
    );
}

#[rstest]
#[case(2, 2, 1)]
#[case(1, 1, 0)]
#[case(0, 0, 0)]
#[case(10, 3, 2)]
fn request_budget_bounds_calls_and_pauses(
    sample: Harness,
    #[case] budget: usize,
    #[case] calls: usize,
    #[case] pauses: usize,
) {
    let elevation = StubElevation::returning([Some(1), Some(2), Some(3)]);
    let table = sample
        .export(
            &elevation,
            &summits()
                .with_elevation(true)
                .with_max_elevation_requests(budget),
        )
        .expect("export builds");

    assert_eq!(elevation.call_count(), calls);
    assert_eq!(sample.pacer.pause_count(), pauses);
    for row in calls..table.len() {
        assert_eq!(table.value(row, ELEVATION_COLUMN), Some(&Value::Null));
    }
}

#[rstest]
fn a_failed_lookup_does_not_stop_the_batch(sample: Harness) {
    let elevation = StubElevation::returning([Some(14_505), None, Some(14_246)]);
    let table = sample
        .export(&elevation, &summits().with_elevation(true))
        .expect("export builds");

    assert_eq!(elevation.call_count(), 3);
    assert_eq!(table.value(1, ELEVATION_COLUMN), Some(&Value::Null));
    assert_eq!(
        table.value(2, ELEVATION_COLUMN),
        Some(&Value::Integer(14_246))
    );
}

#[rstest]
fn out_of_range_coordinates_downgrade_to_null() {
    let fixture = GazetteerFixture::new()
        .with_name(NameRecord::new(1, "Nowhere", "Summit").with_coordinates(95.0, 0.0))
        .with_name(NameRecord::new(2, "Somewhere", "Summit"));
    let harness = Harness::serving(&fixture);
    let elevation = StubElevation::returning([Some(10)]);

    let table = harness
        .export(&elevation, &summits().with_elevation(true))
        .expect("export builds");

    assert_eq!(table.value(0, ELEVATION_COLUMN), Some(&Value::Null));
    assert_eq!(table.value(1, ELEVATION_COLUMN), Some(&Value::Integer(10)));
    assert_eq!(elevation.call_count(), 2);
    assert_eq!(harness.pacer.pause_count(), 1);
}

#[rstest]
fn without_elevation_no_lookups_happen(sample: Harness) {
    let elevation = StubElevation::returning([Some(1)]);
    sample
        .export(&elevation, &summits())
        .expect("export builds");
    assert_eq!(elevation.call_count(), 0);
    assert_eq!(sample.pacer.pause_count(), 0);
}

#[rstest]
fn exports_round_trip_through_delimited_text(sample: Harness) {
    let output = sample.output("exports/ca.txt");
    let elevation = StubElevation::returning([Some(14_505)]);
    let table = sample
        .export(
            &elevation,
            &summits()
                .with_elevation(true)
                .with_output_path(output.clone()),
        )
        .expect("export builds");

    let restored = read_delimited(&output).expect("read export");
    assert_eq!(restored.len(), table.len());
    assert_eq!(restored.columns(), table.columns());
    assert_eq!(restored.value(1, ELEVATION_COLUMN), Some(&Value::Null));
    assert_eq!(restored.value(1, DESCRIPTION_HISTORY_COLUMN), Some(&Value::Null));
}

#[rstest]
fn no_output_path_writes_nothing(sample: Harness) {
    sample
        .export(&StubElevation::default(), &summits())
        .expect("export builds");
    let entries: Vec<_> = std::fs::read_dir(sample.dir.path())
        .expect("list temp dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .into_string()
                .expect("utf-8 file name")
        })
        .collect();
    assert_eq!(entries, ["cache"]);
}

#[rstest]
fn cache_is_cleared_only_after_the_table_is_built(sample: Harness) {
    let output = sample.output("ca.txt");
    let table = sample
        .export(
            &StubElevation::default(),
            &summits()
                .with_clear_cache_after(true)
                .with_output_path(output.clone()),
        )
        .expect("export builds");

    assert_eq!(table.len(), 3);
    assert!(output.is_file());
    assert!(!sample.cache_root().join(ENTRY).exists());
    assert_eq!(sample.transport.download_count(), 1);
}

#[rstest]
fn cache_dir_option_redirects_the_cache(sample: Harness) {
    let elsewhere = TempDir::new().expect("create temp directory");
    sample
        .export(
            &StubElevation::default(),
            &summits().with_cache_dir(elsewhere.path()),
        )
        .expect("export builds");
    assert!(elsewhere.path().join(ENTRY).is_file());
    assert!(!sample.cache_root().exists());
}

#[rstest]
fn thread_sleep_skips_zero_pauses() {
    let started = std::time::Instant::now();
    ThreadSleep.pause(Duration::ZERO);
    assert!(started.elapsed() < Duration::from_millis(50));
}
