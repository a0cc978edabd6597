//! Stub-backed workspace for exercising commands without the network.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use gnis_core::{GnisConfig, Location};
use gnis_data::Acquirer;
use gnis_data::test_support::{GazetteerFixture, RecordingPacer, StubElevation, StubTransport};
use tempfile::TempDir;

use super::*;
use crate::export::{ExportConfig, execute_export};

pub(super) const CALIFORNIA_ENTRY: &str = "Gazetteer_CA_GPKG.gpkg";

/// A scratch directory plus a stub archive mirror serving the sample
/// gazetteer for California.
pub(super) struct Workspace {
    dir: TempDir,
    pub(super) transport: StubTransport,
    pub(super) elevation: StubElevation,
    pub(super) pacer: RecordingPacer,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let location = Location::parse("CA").expect("valid location");
        let archive = GazetteerFixture::sample()
            .archive_for(location)
            .expect("build fixture archive");
        Self {
            dir: TempDir::new().expect("tempdir"),
            transport: StubTransport::with_archive(archive),
            elevation: StubElevation::default(),
            pacer: RecordingPacer::default(),
        }
    }

    pub(super) fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf-8 workspace")
    }

    pub(super) fn acquirer(&self) -> Acquirer<&StubTransport> {
        Acquirer::new(
            GnisConfig::default().with_cache_root(self.cache_root()),
            &self.transport,
        )
    }

    /// Place a placeholder file named `entry` in the cache root.
    pub(super) fn seed_cache_entry(&self, entry: &str) -> PathBuf {
        let root = self.cache_root();
        std::fs::create_dir_all(&root).expect("create cache root");
        let path = root.join(entry);
        std::fs::write(&path, b"cached").expect("write cache entry");
        path
    }

    /// Run `export` against the stubs and return the printed summary.
    pub(super) fn export(&self, config: &ExportConfig) -> Result<serde_json::Value, CliError> {
        let mut out = Vec::new();
        execute_export(
            config,
            &self.acquirer(),
            &self.elevation,
            &self.pacer,
            &mut out,
        )?;
        Ok(parse_output(&out))
    }
}

pub(super) fn parse_output(out: &[u8]) -> serde_json::Value {
    serde_json::from_slice(out).expect("command prints JSON")
}

/// Parse `invocation` the way the binary does, prefixing the program name.
pub(super) fn parse(invocation: &[&str]) -> Result<Cli, CliError> {
    let mut argv = vec!["gnis"];
    argv.extend_from_slice(invocation);
    Cli::try_parse_from(argv).map_err(CliError::ArgumentParsing)
}
