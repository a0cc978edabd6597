//! World state shared by the acquisition and export behaviour tests.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use gnis_core::{GnisConfig, Location};
use gnis_data::Acquirer;
use gnis_data::test_support::{GazetteerFixture, StubTransport};
use tempfile::TempDir;

/// Cache entry name for the California fixture.
pub const CALIFORNIA_ENTRY: &str = "Gazetteer_CA_GPKG.gpkg";

/// A stub archive mirror plus a scratch directory holding the cache.
pub struct Mirror {
    dir: TempDir,
    pub transport: StubTransport,
}

impl Mirror {
    /// Serve the sample gazetteer as the California archive.
    pub fn sample() -> Self {
        let location = Location::parse("CA").expect("valid location");
        let archive = GazetteerFixture::sample()
            .archive_for(location)
            .unwrap_or_else(|err| panic!("failed to build fixture archive: {err}"));
        Self {
            dir: TempDir::new().expect("create temp directory"),
            transport: StubTransport::with_archive(archive),
        }
    }

    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn california_entry(&self) -> PathBuf {
        self.cache_root().join(CALIFORNIA_ENTRY)
    }

    /// A UTF-8 path inside the scratch directory.
    #[allow(dead_code)]
    pub fn scratch(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf-8 temp dir")
    }

    pub fn acquirer(&self) -> Acquirer<&StubTransport> {
        Acquirer::new(
            GnisConfig::default().with_cache_root(self.cache_root()),
            &self.transport,
        )
    }
}
