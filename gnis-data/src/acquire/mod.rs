//! Download, extract, stage, and load gazetteer layers.
//!
//! [`Acquirer::acquire`] runs the whole path for one location and layer:
//!
//! 1. validate the location (no I/O on failure);
//! 2. when caching, try the cached GeoPackage and evict it if it fails to
//!    parse;
//! 3. download the archive and extract the location's GeoPackage member;
//! 4. persist the member to the cache, or to a temporary file that is
//!    removed on every exit path;
//! 5. load the requested layer.
//!
//! A corrupt cache entry costs exactly one fresh download. There is no loop:
//! if the fresh copy also fails to load, the load error is returned.
//!
//! # Examples
//! ```
//! use gnis_core::{GnisConfig, Location};
//! use gnis_data::{AcquireOptions, Acquirer};
//! use gnis_data::test_support::{GazetteerFixture, StubTransport};
//!
//! let location = Location::parse("ca")?;
//! let archive = GazetteerFixture::sample().archive_for(location)?;
//! let transport = StubTransport::with_archive(archive);
//! let acquirer = Acquirer::new(GnisConfig::default(), &transport);
//!
//! let names = acquirer.acquire("ca", &AcquireOptions::default().with_layer("DomesticNames"))?;
//! assert_eq!(names.len(), 5);
//! assert_eq!(transport.download_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod archive;
mod transport;

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use gnis_core::{GnisConfig, Location, Table};
use log::info;

pub use archive::{ArchiveReader, ExtractError, ZipArchiveReader};
pub use transport::{ArchiveTransport, HttpArchiveTransport};

use crate::cache::{CacheLookup, CacheStore};
use crate::gpkg::{GeoPackageReader, LayerReader};
use crate::{AcquireError, TransportError};

const DEFAULT_LAYER_LABEL: &str = "<default>";

/// URL of the downloadable archive for `location`.
#[must_use]
pub fn archive_url(location: Location, config: &GnisConfig) -> String {
    format!("{}{}", config.archive_base_url, location.archive_name())
}

/// Download the archive for `location` into memory.
///
/// # Errors
/// Returns [`AcquireError::Validation`] for an unknown location (before any
/// request) and [`AcquireError::Download`] when the transfer fails.
pub fn download_archive<T: ArchiveTransport + ?Sized>(
    location: &str,
    transport: &T,
    config: &GnisConfig,
) -> Result<Vec<u8>, AcquireError> {
    let location = Location::parse(location)?;
    fetch(location, transport, config)
}

/// Extract the GeoPackage member for `location` from archive bytes.
///
/// # Errors
/// Returns [`AcquireError::Validation`] for an unknown location and the
/// extraction variants of [`AcquireError`] when the member cannot be read.
pub fn extract_member(archive: &[u8], location: &str) -> Result<Vec<u8>, AcquireError> {
    let location = Location::parse(location)?;
    unpack(location, archive, &ZipArchiveReader)
}

fn fetch<T: ArchiveTransport + ?Sized>(
    location: Location,
    transport: &T,
    config: &GnisConfig,
) -> Result<Vec<u8>, AcquireError> {
    let url = archive_url(location, config);
    info!("downloading GNIS data for {location} from {url}");
    let mut archive = Vec::new();
    let bytes = transport
        .download(&url, &mut archive)
        .map_err(|source| AcquireError::Download { location, source })?;
    info!("downloaded {bytes} bytes for {location}");
    Ok(archive)
}

fn unpack<A: ArchiveReader + ?Sized>(
    location: Location,
    archive: &[u8],
    reader: &A,
) -> Result<Vec<u8>, AcquireError> {
    let member = location.member_name();
    info!("extracting {member}");
    reader
        .extract(archive, &member)
        .map_err(|err| match err {
            ExtractError::Malformed { message } => AcquireError::MalformedArchive { location, message },
            ExtractError::MemberNotFound { member, available } => AcquireError::MemberNotFound {
                location,
                member,
                available,
            },
            ExtractError::Read { member, source } => AcquireError::ReadMember {
                location,
                member,
                source,
            },
        })
}

/// Per-call options for [`Acquirer::acquire`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Layer to load; the first registered layer when `None`.
    pub layer: Option<String>,
    /// Read from and write to the cache.
    pub use_cache: bool,
    /// Cache root overriding the configured default.
    pub cache_root: Option<PathBuf>,
}

impl AcquireOptions {
    /// Load the named layer.
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Enable or disable the cache.
    #[must_use]
    pub const fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Use `root` instead of the configured cache root.
    #[must_use]
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    fn layer_label(&self) -> String {
        self.layer
            .clone()
            .unwrap_or_else(|| DEFAULT_LAYER_LABEL.to_owned())
    }
}

/// Runs the acquisition path with pluggable transport and readers.
#[derive(Debug)]
pub struct Acquirer<T, A = ZipArchiveReader, L = GeoPackageReader> {
    config: GnisConfig,
    transport: T,
    archives: A,
    layers: L,
}

impl Acquirer<HttpArchiveTransport> {
    /// An acquirer downloading over HTTP with the configured settings.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the HTTP client cannot be built.
    pub fn http(config: GnisConfig) -> Result<Self, TransportError> {
        let transport = HttpArchiveTransport::new(&config)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: ArchiveTransport> Acquirer<T> {
    /// An acquirer using `transport` with the ZIP and GeoPackage readers.
    #[must_use]
    pub const fn new(config: GnisConfig, transport: T) -> Self {
        Self::with_readers(config, transport, ZipArchiveReader, GeoPackageReader)
    }
}

impl<T, A, L> Acquirer<T, A, L>
where
    T: ArchiveTransport,
    A: ArchiveReader,
    L: LayerReader,
{
    /// An acquirer with explicit archive and layer readers.
    #[must_use]
    pub const fn with_readers(config: GnisConfig, transport: T, archives: A, layers: L) -> Self {
        Self {
            config,
            transport,
            archives,
            layers,
        }
    }

    /// The configuration this acquirer was built with.
    #[must_use]
    pub const fn config(&self) -> &GnisConfig {
        &self.config
    }

    /// The cache store `options` select.
    #[must_use]
    pub fn cache_store(&self, options: &AcquireOptions) -> CacheStore {
        CacheStore::resolve(&self.config, options.cache_root.as_deref())
    }

    /// Validate `location` and acquire the requested layer.
    ///
    /// # Errors
    /// Returns [`AcquireError::Validation`] before any I/O when `location`
    /// is unknown, and the other [`AcquireError`] variants for download,
    /// extraction, staging, and load failures.
    pub fn acquire(&self, location: &str, options: &AcquireOptions) -> Result<Table, AcquireError> {
        let location = Location::parse(location)?;
        self.acquire_location(location, options)
    }

    /// Acquire the requested layer for an already validated location.
    ///
    /// # Errors
    /// See [`Acquirer::acquire`].
    pub fn acquire_location(
        &self,
        location: Location,
        options: &AcquireOptions,
    ) -> Result<Table, AcquireError> {
        let layer = options.layer.as_deref();
        let store = self.cache_store(options);

        if options.use_cache {
            let lookup = store.read_with(location, |path| self.layers.read_layer(path, layer))?;
            if let CacheLookup::Hit(table) = lookup {
                return Ok(table);
            }
        }

        let archive = self.download(location)?;
        let member = self.extract(location, &archive)?;

        if options.use_cache {
            let path = store.store(location, &member)?;
            self.load(location, options, &path)
        } else {
            self.load_ephemeral(location, options, &member)
        }
    }

    /// Download the archive for `location` into memory.
    ///
    /// # Errors
    /// Returns [`AcquireError::Download`] when the transfer fails.
    pub fn download(&self, location: Location) -> Result<Vec<u8>, AcquireError> {
        fetch(location, &self.transport, &self.config)
    }

    /// Extract the GeoPackage member for `location` from `archive`.
    ///
    /// # Errors
    /// Returns the extraction variants of [`AcquireError`].
    pub fn extract(&self, location: Location, archive: &[u8]) -> Result<Vec<u8>, AcquireError> {
        unpack(location, archive, &self.archives)
    }

    fn load(
        &self,
        location: Location,
        options: &AcquireOptions,
        path: &Path,
    ) -> Result<Table, AcquireError> {
        info!("loading layer {} for {location}", options.layer_label());
        self.layers
            .read_layer(path, options.layer.as_deref())
            .map_err(|source| AcquireError::LoadLayer {
                location,
                layer: options.layer_label(),
                source,
            })
    }

    fn load_ephemeral(
        &self,
        location: Location,
        options: &AcquireOptions,
        member: &[u8],
    ) -> Result<Table, AcquireError> {
        let member_name = location.member_name();
        let staging_error = |source| AcquireError::Ephemeral {
            member: member_name.clone(),
            source,
        };
        // Dropping the handle deletes the file, whichever way this returns.
        let mut staged = tempfile::Builder::new()
            .prefix("gnis-")
            .suffix(".gpkg")
            .tempfile()
            .map_err(staging_error)?;
        staged.write_all(member).map_err(staging_error)?;
        staged.flush().map_err(staging_error)?;
        self.load(location, options, staged.path())
    }
}
