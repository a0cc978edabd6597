//! Behaviour-driven step definitions driving the command scenarios.

use super::helpers::{CALIFORNIA_ENTRY, Workspace, parse, parse_output};
use super::*;
use crate::export::ExportConfig;
use gnis_data::enrich::{ELEVATION_COLUMN, export_columns};
use gnis_data::test_support::StubElevation;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

const EXPORT_FILE: &str = "summits.txt";

/// Scenario state shared by every step.
struct CommandWorld {
    workspace: RefCell<Workspace>,
    outcome: RefCell<Option<Result<serde_json::Value, CliError>>>,
}

impl CommandWorld {
    fn new() -> Self {
        Self {
            workspace: RefCell::new(Workspace::new()),
            outcome: RefCell::new(None),
        }
    }

    /// Parse `invocation` and run it against the stubs.
    ///
    /// `export` goes through the stub mirror; every other command is
    /// dispatched as the binary would.
    fn run(&self, invocation: &[&str]) {
        let workspace = self.workspace.borrow();
        let outcome = parse(invocation).and_then(|cli| match cli.command {
            Command::Export(args) => {
                let config = ExportConfig::try_from(args)?;
                workspace.export(&config)
            }
            command => {
                let mut out = Vec::new();
                dispatch(command, &mut out).map(|()| parse_output(&out))
            }
        });
        self.outcome.replace(Some(outcome));
    }

    fn summary(&self) -> serde_json::Value {
        self.outcome
            .borrow()
            .as_ref()
            .expect("a command was run")
            .as_ref()
            .expect("expected the command to succeed")
            .clone()
    }

    fn cache_dir(&self) -> String {
        let root = self.workspace.borrow().cache_root();
        root.to_str().expect("utf-8 cache root").to_owned()
    }

    fn export_path(&self) -> String {
        self.workspace.borrow().path(EXPORT_FILE).into_string()
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("a mirror serving the sample gazetteer")]
fn sample_mirror(#[from(world)] world: &CommandWorld) {
    assert_eq!(world.workspace.borrow().transport.download_count(), 0);
}

#[given("an elevation service that knows one summit")]
fn elevation_for_one_summit(#[from(world)] world: &CommandWorld) {
    world.workspace.borrow_mut().elevation = StubElevation::returning([Some(14_505)]);
}

#[given("a cached California entry")]
fn cached_california(#[from(world)] world: &CommandWorld) {
    world.workspace.borrow().seed_cache_entry(CALIFORNIA_ENTRY);
}

#[when("I run export for summits into a file")]
fn export_into_file(#[from(world)] world: &CommandWorld) {
    let output = world.export_path();
    world.run(&[
        "export",
        "--location",
        "CA",
        "--class",
        "Summit",
        "--output",
        &output,
    ]);
}

#[when("I run export for summits with one elevation lookup")]
fn export_with_one_lookup(#[from(world)] world: &CommandWorld) {
    world.run(&[
        "export",
        "--location",
        "CA",
        "--class",
        "Summit",
        "--elevation",
        "--max-elevation-requests",
        "1",
    ]);
}

#[when("I run export without a feature class")]
fn export_without_class(#[from(world)] world: &CommandWorld) {
    world.run(&["export", "--location", "CA"]);
}

#[when("I clear the cache for California")]
fn clear_california(#[from(world)] world: &CommandWorld) {
    let cache_dir = world.cache_dir();
    world.run(&["cache", "clear", "--location", "ca", "--cache-dir", &cache_dir]);
}

#[then("the summary reports three features")]
fn three_features(#[from(world)] world: &CommandWorld) {
    assert_eq!(world.summary()["features"], 3);
}

#[then("the export file starts with the public header")]
fn public_header(#[from(world)] world: &CommandWorld) {
    let text = std::fs::read_to_string(world.export_path()).expect("read export file");
    let header = text.lines().next().expect("export has a header line");
    assert_eq!(header, export_columns(false).join("|"));
}

#[then("the summary lists the elevation column")]
fn lists_elevation(#[from(world)] world: &CommandWorld) {
    let summary = world.summary();
    let columns = summary["columns"].as_array().expect("columns array");
    assert_eq!(
        columns.last().and_then(serde_json::Value::as_str),
        Some(ELEVATION_COLUMN)
    );
}

#[then("one elevation lookup is made")]
fn one_lookup(#[from(world)] world: &CommandWorld) {
    let workspace = world.workspace.borrow();
    assert_eq!(workspace.elevation.call_count(), 1);
    assert_eq!(workspace.pacer.pause_count(), 0);
}

#[then("the command reports that the \"class\" flag is missing")]
fn reports_missing_class(#[from(world)] world: &CommandWorld) {
    let borrowed = world.outcome.borrow();
    let error = borrowed
        .as_ref()
        .expect("a command was run")
        .as_ref()
        .expect_err("expected an error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_CLASS),
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("one cache entry is reported removed")]
fn one_removed(#[from(world)] world: &CommandWorld) {
    assert_eq!(world.summary()["removed"], 1);
}

#[then("the cache entry is gone")]
fn entry_gone(#[from(world)] world: &CommandWorld) {
    let entry = world.workspace.borrow().cache_root().join(CALIFORNIA_ENTRY);
    assert!(!entry.exists(), "expected {} to be removed", entry.display());
}

macro_rules! register_command_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/export_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CommandWorld) {
            let _ = world;
        }
    };
}

register_command_scenario!(
    exporting_to_file,
    "exporting summits to a pipe-delimited file"
);
register_command_scenario!(
    limiting_lookups,
    "limiting elevation lookups from the command line"
);
register_command_scenario!(
    rejecting_missing_class,
    "rejecting an export without a feature class"
);
register_command_scenario!(clearing_one_location, "clearing one cached location");
