//! Test doubles and fixture builders.
//!
//! The doubles are deterministic and count their calls so tests can assert
//! how many downloads, extractions, layer loads, elevation queries, and
//! pauses an operation performed. The fixture builders write real
//! GeoPackage files and wrap them in real ZIP archives.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, Cursor, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use gnis_core::{LatLon, Location, Table, Units};
use rusqlite::{Connection, params};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    ArchiveReader, ArchiveTransport, ElevationError, ElevationService, ExtractError,
    GeoPackageReader, LayerError, LayerReader, Pacer, PointElevation, TransportError,
    ZipArchiveReader,
};

const SRS_WGS84: i32 = 4326;

/// Encode a little-endian GeoPackage point blob without an envelope.
#[must_use]
pub fn gpkg_point(x: f64, y: f64) -> Vec<u8> {
    let mut blob = b"GP".to_vec();
    // version 0, flags: little endian, no envelope
    blob.extend_from_slice(&[0, 0b0000_0001]);
    blob.extend_from_slice(&SRS_WGS84.to_le_bytes());
    blob.push(1);
    blob.extend_from_slice(&1_u32.to_le_bytes());
    blob.extend_from_slice(&x.to_le_bytes());
    blob.extend_from_slice(&y.to_le_bytes());
    blob
}

/// Bytes that SQLite rejects as "not a database".
#[must_use]
pub fn corrupt_geopackage() -> Vec<u8> {
    vec![0xAB; 4096]
}

/// Build an in-memory ZIP archive holding `members`.
///
/// # Errors
/// Returns an I/O error if the archive cannot be written.
pub fn zip_archive(members: &[(&str, &[u8])]) -> io::Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in members {
        writer.start_file(*name, options).map_err(io::Error::other)?;
        writer.write_all(bytes)?;
    }
    let cursor = writer.finish().map_err(io::Error::other)?;
    Ok(cursor.into_inner())
}

/// One row of the `DomesticNames` fixture layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NameRecord {
    pub feature_id: i64,
    pub feature_name: String,
    pub feature_class: String,
    pub state_name: String,
    pub county_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NameRecord {
    /// A record in Inyo County, California, at Mount Whitney's coordinates.
    #[must_use]
    pub fn new(feature_id: i64, name: &str, class: &str) -> Self {
        Self {
            feature_id,
            feature_name: name.to_owned(),
            feature_class: class.to_owned(),
            state_name: "California".to_owned(),
            county_name: "Inyo".to_owned(),
            latitude: 36.578_581,
            longitude: -118.291_994,
        }
    }

    /// Override the primary coordinates.
    #[must_use]
    pub const fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }
}

/// One row of the `FeatureDescriptionHistory` fixture layer.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub feature_id: i64,
    pub description: Option<String>,
    pub history: Option<String>,
}

/// Builder for a two-layer gazetteer GeoPackage.
#[derive(Debug, Clone, Default)]
pub struct GazetteerFixture {
    names: Vec<NameRecord>,
    histories: Vec<HistoryRecord>,
}

impl GazetteerFixture {
    /// An empty fixture; both layers exist but hold no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Three summits, a stream, and a lake. Two summits carry history rows.
    #[must_use]
    pub fn sample() -> Self {
        Self::new()
            .with_name(NameRecord::new(255_311, "Mount Whitney", "Summit"))
            .with_name(
                NameRecord::new(255_312, "Mount Williamson", "Summit")
                    .with_coordinates(36.656_3, -118.310_9),
            )
            .with_name(
                NameRecord::new(255_400, "Lone Pine Creek", "Stream")
                    .with_coordinates(36.601_6, -118.056_2),
            )
            .with_name(
                NameRecord::new(255_313, "White Mountain Peak", "Summit")
                    .with_coordinates(37.634_2, -118.255_7),
            )
            .with_name(
                NameRecord::new(255_500, "Owens Lake", "Lake").with_coordinates(36.433_0, -117.950_1),
            )
            .with_history(
                255_311,
                Some("Highest summit in the contiguous United States"),
                Some("Named in 1864 for Josiah Whitney"),
            )
            .with_history(255_313, Some("Highest point of the White Mountains"), None)
    }

    /// Append a `DomesticNames` row.
    #[must_use]
    pub fn with_name(mut self, record: NameRecord) -> Self {
        self.names.push(record);
        self
    }

    /// Append a `FeatureDescriptionHistory` row.
    #[must_use]
    pub fn with_history(
        mut self,
        feature_id: i64,
        description: Option<&str>,
        history: Option<&str>,
    ) -> Self {
        self.histories.push(HistoryRecord {
            feature_id,
            description: description.map(str::to_owned),
            history: history.map(str::to_owned),
        });
        self
    }

    /// Write the fixture as a GeoPackage at `path`.
    ///
    /// # Errors
    /// Returns any SQLite error raised while creating the file.
    pub fn write_geopackage(&self, path: &Path) -> rusqlite::Result<()> {
        let mut connection = Connection::open(path)?;
        let transaction = connection.transaction()?;
        transaction.execute_batch(
            "CREATE TABLE gpkg_contents (
                table_name TEXT NOT NULL PRIMARY KEY,
                data_type TEXT NOT NULL,
                identifier TEXT,
                srs_id INTEGER
            );
            CREATE TABLE gpkg_geometry_columns (
                table_name TEXT NOT NULL,
                column_name TEXT NOT NULL,
                geometry_type_name TEXT NOT NULL,
                srs_id INTEGER NOT NULL,
                z TINYINT NOT NULL,
                m TINYINT NOT NULL,
                PRIMARY KEY (table_name, column_name)
            );
            CREATE TABLE \"DomesticNames\" (
                feature_id INTEGER,
                feature_name TEXT,
                feature_class TEXT,
                state_name TEXT,
                county_name TEXT,
                prim_lat_dec REAL,
                prim_long_dec REAL,
                geom POINT
            );
            CREATE TABLE \"FeatureDescriptionHistory\" (
                feature_id INTEGER,
                description TEXT,
                history TEXT
            );
            INSERT INTO gpkg_contents VALUES ('DomesticNames', 'features', 'DomesticNames', 4326);
            INSERT INTO gpkg_contents VALUES
                ('FeatureDescriptionHistory', 'attributes', 'FeatureDescriptionHistory', NULL);
            INSERT INTO gpkg_geometry_columns VALUES ('DomesticNames', 'geom', 'POINT', 4326, 0, 0);",
        )?;
        {
            let mut insert_name = transaction.prepare(
                "INSERT INTO \"DomesticNames\" VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in &self.names {
                insert_name.execute(params![
                    record.feature_id,
                    record.feature_name,
                    record.feature_class,
                    record.state_name,
                    record.county_name,
                    record.latitude,
                    record.longitude,
                    gpkg_point(record.longitude, record.latitude),
                ])?;
            }
            let mut insert_history = transaction
                .prepare("INSERT INTO \"FeatureDescriptionHistory\" VALUES (?1, ?2, ?3)")?;
            for record in &self.histories {
                insert_history.execute(params![
                    record.feature_id,
                    record.description,
                    record.history,
                ])?;
            }
        }
        transaction.commit()
    }

    /// The fixture serialised as GeoPackage bytes.
    ///
    /// # Errors
    /// Returns an I/O error when the scratch file cannot be written or read.
    pub fn geopackage_bytes(&self) -> io::Result<Vec<u8>> {
        let scratch = tempfile::tempdir()?;
        let path = scratch.path().join("fixture.gpkg");
        self.write_geopackage(&path).map_err(io::Error::other)?;
        std::fs::read(path)
    }

    /// A ZIP archive holding the fixture under `location`'s member name.
    ///
    /// # Errors
    /// Returns an I/O error when the GeoPackage or archive cannot be built.
    pub fn archive_for(&self, location: Location) -> io::Result<Vec<u8>> {
        let geopackage = self.geopackage_bytes()?;
        zip_archive(&[(location.member_name().as_str(), geopackage.as_slice())])
    }
}

#[derive(Debug, Clone)]
enum StubDownload {
    Archive(Vec<u8>),
    Status(u16),
    Offline,
}

/// [`ArchiveTransport`] serving canned bytes or a canned failure.
#[derive(Debug)]
pub struct StubTransport {
    response: StubDownload,
    urls: RefCell<Vec<String>>,
}

impl StubTransport {
    /// Serve `archive` for every request.
    #[must_use]
    pub const fn with_archive(archive: Vec<u8>) -> Self {
        Self {
            response: StubDownload::Archive(archive),
            urls: RefCell::new(Vec::new()),
        }
    }

    /// Fail every request with an HTTP `status`.
    #[must_use]
    pub const fn failing_with_status(status: u16) -> Self {
        Self {
            response: StubDownload::Status(status),
            urls: RefCell::new(Vec::new()),
        }
    }

    /// Fail every request with a refused connection.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            response: StubDownload::Offline,
            urls: RefCell::new(Vec::new()),
        }
    }

    /// Number of downloads attempted.
    #[must_use]
    pub fn download_count(&self) -> usize {
        self.urls.borrow().len()
    }

    /// URLs requested, in order.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.borrow().clone()
    }
}

impl ArchiveTransport for StubTransport {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.urls.borrow_mut().push(url.to_owned());
        match &self.response {
            StubDownload::Archive(bytes) => {
                sink.write_all(bytes)
                    .map_err(|source| TransportError::Network {
                        url: url.to_owned(),
                        source,
                    })?;
                Ok(bytes.len() as u64)
            }
            StubDownload::Status(status) => Err(TransportError::Http {
                url: url.to_owned(),
                status: *status,
                message: format!("stub transport returned {status}"),
            }),
            StubDownload::Offline => Err(TransportError::Network {
                url: url.to_owned(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "stub transport is offline"),
            }),
        }
    }
}

/// [`ArchiveReader`] that counts extractions.
#[derive(Debug, Default)]
pub struct CountingArchiveReader {
    members: RefCell<Vec<String>>,
}

impl CountingArchiveReader {
    /// Number of extractions attempted.
    #[must_use]
    pub fn extraction_count(&self) -> usize {
        self.members.borrow().len()
    }
}

impl ArchiveReader for CountingArchiveReader {
    fn extract(&self, archive: &[u8], member: &str) -> Result<Vec<u8>, ExtractError> {
        self.members.borrow_mut().push(member.to_owned());
        ZipArchiveReader.extract(archive, member)
    }
}

/// [`LayerReader`] that records every load before delegating to
/// [`GeoPackageReader`].
#[derive(Debug, Default)]
pub struct CountingLayerReader {
    loads: RefCell<Vec<(PathBuf, Option<String>)>>,
}

impl CountingLayerReader {
    /// Number of layer loads attempted.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.borrow().len()
    }

    /// Paths and layer names requested, in order.
    #[must_use]
    pub fn loads(&self) -> Vec<(PathBuf, Option<String>)> {
        self.loads.borrow().clone()
    }
}

impl LayerReader for CountingLayerReader {
    fn read_layer(&self, path: &Path, layer: Option<&str>) -> Result<Table, LayerError> {
        self.loads
            .borrow_mut()
            .push((path.to_path_buf(), layer.map(str::to_owned)));
        GeoPackageReader.read_layer(path, layer)
    }
}

/// [`PointElevation`] returning scripted elevations in call order.
///
/// `None` entries, and every call after the script runs out, report
/// [`ElevationError::NoData`]. Coordinates are validated like the real
/// client, and rejected calls are still counted.
#[derive(Debug, Default)]
pub struct StubElevation {
    outcomes: RefCell<VecDeque<Option<i64>>>,
    calls: RefCell<Vec<(f64, f64)>>,
}

impl StubElevation {
    /// Script the outcomes of successive calls.
    #[must_use]
    pub fn returning(outcomes: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into_iter().collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Number of lookups requested.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// `(lat, lon)` pairs requested, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.borrow().clone()
    }
}

impl PointElevation for StubElevation {
    fn get_elevation(&self, lat: f64, lon: f64, _units: Units) -> Result<i64, ElevationError> {
        self.calls.borrow_mut().push((lat, lon));
        LatLon::new(lat, lon)?;
        self.outcomes
            .borrow_mut()
            .pop_front()
            .flatten()
            .ok_or(ElevationError::NoData { lat, lon })
    }
}

/// [`ElevationService`] replying with a fixed body or HTTP status.
#[derive(Debug)]
pub struct StubElevationService {
    reply: Result<String, u16>,
    queries: RefCell<Vec<(LatLon, Units)>>,
}

impl StubElevationService {
    /// Reply to every query with `body`.
    #[must_use]
    pub fn with_body(body: &str) -> Self {
        Self {
            reply: Ok(body.to_owned()),
            queries: RefCell::new(Vec::new()),
        }
    }

    /// Fail every query with an HTTP `status`.
    #[must_use]
    pub const fn failing_with_status(status: u16) -> Self {
        Self {
            reply: Err(status),
            queries: RefCell::new(Vec::new()),
        }
    }

    /// Queries received, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<(LatLon, Units)> {
        self.queries.borrow().clone()
    }
}

impl ElevationService for StubElevationService {
    fn fetch(&self, point: LatLon, units: Units) -> Result<String, TransportError> {
        self.queries.borrow_mut().push((point, units));
        self.reply.clone().map_err(|status| TransportError::Http {
            url: "https://elevation.invalid/v1/json".to_owned(),
            status,
            message: format!("stub service returned {status}"),
        })
    }
}

/// [`Pacer`] that records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: RefCell<Vec<Duration>>,
}

impl RecordingPacer {
    /// Number of pauses requested.
    #[must_use]
    pub fn pause_count(&self) -> usize {
        self.pauses.borrow().len()
    }

    /// Requested pause durations, in order.
    #[must_use]
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}
