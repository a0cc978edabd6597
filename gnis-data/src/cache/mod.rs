//! On-disk cache of extracted GeoPackages.
//!
//! Entries are stored flat under a root directory, one file per location,
//! named after the archive member (`Gazetteer_CA_GPKG.gpkg`). The layer is
//! not part of the key: one entry serves every layer of its location.
//!
//! No file locking is performed. Processes sharing a root must serialise
//! their writes externally.

use std::{
    fmt::Display,
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use camino::Utf8Path;
use gnis_core::{GnisConfig, Location};
use log::{debug, info, warn};
use serde::Serialize;

use crate::CacheError;

/// Extension shared by every cache entry.
pub const CACHE_EXTENSION: &str = "gpkg";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of [`CacheStore::read_with`].
#[derive(Debug)]
pub enum CacheLookup<T> {
    /// The entry existed and parsed.
    Hit(T),
    /// No entry existed.
    Miss,
    /// The entry existed but failed to parse and has been removed.
    Evicted,
}

/// Summary of one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub modified: SystemTime,
    pub path: PathBuf,
}

/// Summary of a cache root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheInfo {
    pub cache_dir: PathBuf,
    /// Entries sorted by file name.
    pub entries: Vec<CacheEntryInfo>,
    pub total_size_mb: f64,
}

/// Location-keyed store of GeoPackage files under one root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// A store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A store rooted at `root`, or at the configured default when `None`.
    #[must_use]
    pub fn resolve(config: &GnisConfig, root: Option<&Path>) -> Self {
        Self::new(root.unwrap_or(config.cache_root.as_path()))
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `location`. Pure; touches no filesystem state.
    #[must_use]
    pub fn resolve_path(&self, location: Location) -> PathBuf {
        self.root.join(location.member_name())
    }

    /// Create the root directory and return the entry path for `location`.
    ///
    /// # Errors
    /// Returns [`CacheError::CreateRoot`] when the root cannot be created.
    pub fn prepare_path(&self, location: Location) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.root).map_err(|source| CacheError::CreateRoot {
            path: self.root.clone(),
            source,
        })?;
        Ok(self.resolve_path(location))
    }

    /// Whether an entry exists for `location`.
    #[must_use]
    pub fn is_present(&self, location: Location) -> bool {
        entry_exists(&self.resolve_path(location))
    }

    /// The stored bytes for `location`, or `None` when absent.
    ///
    /// # Errors
    /// Returns [`CacheError::Read`] when an existing entry cannot be read.
    pub fn load_or_none(&self, location: Location) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.resolve_path(location);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read { path, source }),
        }
    }

    /// Write `bytes` as the entry for `location`, replacing any existing one.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the root or the entry cannot be written.
    pub fn store(&self, location: Location, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.prepare_path(location)?;
        fs::write(&path, bytes).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        info!("cached {} at {}", location.member_name(), path.display());
        Ok(path)
    }

    /// Remove the entry for `location`, or every entry when `None`.
    ///
    /// A missing root or entry is not an error. Returns the number of files
    /// removed.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the root cannot be listed or a file
    /// cannot be removed.
    pub fn evict(&self, location: Option<Location>) -> Result<usize, CacheError> {
        let targets = match location {
            Some(location) => vec![self.resolve_path(location)],
            None => self.entry_paths()?,
        };
        let mut removed = 0;
        for path in targets {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("removed cache entry {}", path.display());
                    removed += 1;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!("no cache entry at {}", path.display());
                }
                Err(source) => return Err(CacheError::Remove { path, source }),
            }
        }
        Ok(removed)
    }

    /// Describe every entry under the root.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the root or an entry cannot be inspected.
    pub fn info(&self) -> Result<CacheInfo, CacheError> {
        let mut entries = Vec::new();
        for path in self.entry_paths()? {
            let metadata = fs::metadata(&path).map_err(|source| CacheError::Read {
                path: path.clone(),
                source,
            })?;
            let modified = metadata.modified().map_err(|source| CacheError::Read {
                path: path.clone(),
                source,
            })?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(CacheEntryInfo {
                filename,
                size_bytes: metadata.len(),
                size_mb: to_mb(metadata.len()),
                modified,
                path,
            });
        }
        let total_bytes = entries.iter().map(|entry| entry.size_bytes).sum();
        Ok(CacheInfo {
            cache_dir: self.root.clone(),
            entries,
            total_size_mb: to_mb(total_bytes),
        })
    }

    /// Parse the entry for `location`, evicting it if parsing fails.
    ///
    /// This is the first phase of a cached acquisition: a hit is returned
    /// as-is; a corrupt entry is removed and reported as
    /// [`CacheLookup::Evicted`] so the caller can fall through to a single
    /// fresh download. The parse error itself is logged, not returned.
    ///
    /// # Errors
    /// Returns [`CacheError`] only when the corrupt entry cannot be removed.
    pub fn read_with<T, E, F>(&self, location: Location, parse: F) -> Result<CacheLookup<T>, CacheError>
    where
        E: Display,
        F: FnOnce(&Path) -> Result<T, E>,
    {
        let path = self.resolve_path(location);
        if !entry_exists(&path) {
            return Ok(CacheLookup::Miss);
        }
        match parse(&path) {
            Ok(value) => {
                info!("loaded {location} from cache at {}", path.display());
                Ok(CacheLookup::Hit(value))
            }
            Err(err) => {
                warn!(
                    "cached file {} is corrupted ({err}); removing it and downloading again",
                    path.display()
                );
                fs::remove_file(&path).map_err(|source| CacheError::Remove {
                    path: path.clone(),
                    source,
                })?;
                Ok(CacheLookup::Evicted)
            }
        }
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let listing = match fs::read_dir(&self.root) {
            Ok(listing) => listing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::List {
                    path: self.root.clone(),
                    source,
                });
            }
        };
        let mut paths = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|source| CacheError::List {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            let is_entry = path
                .extension()
                .is_some_and(|extension| extension == CACHE_EXTENSION);
            if is_entry && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Whether `path` names a regular file. Unreadable parents count as absent.
fn entry_exists(path: &Path) -> bool {
    match Utf8Path::from_path(path) {
        Some(path) => gnis_fs::is_file(path).unwrap_or_else(|err| {
            debug!("treating {path} as absent: {err}");
            false
        }),
        None => path.is_file(),
    }
}
