//! Immutable runtime configuration shared by the pipeline components.
//!
//! A [`GnisConfig`] is assembled once (defaults, then `with_*` overrides) and
//! handed to each component at construction time. Nothing reads ambient
//! global state, so tests substitute cache roots and service URLs freely.
//!
//! # Examples
//! ```
//! use std::time::Duration;
//! use gnis_core::GnisConfig;
//!
//! let config = GnisConfig::default()
//!     .with_cache_root("/tmp/gnis-cache")
//!     .with_download_timeout(Duration::from_secs(5));
//! assert_eq!(config.cache_root.to_str(), Some("/tmp/gnis-cache"));
//! assert_eq!(config.elevation_timeout, Duration::from_secs(10));
//! ```

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

/// Directory holding the published gazetteer archives.
pub const DEFAULT_ARCHIVE_BASE_URL: &str =
    "https://prd-tnm.s3.amazonaws.com/StagedProducts/GeographicNames/FullModel/";

/// Point elevation query endpoint.
pub const DEFAULT_ELEVATION_URL: &str = "https://epqs.nationalmap.gov/v1/json";

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "gnis-engine/0.1";

/// Per-request timeout for archive downloads.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for elevation queries.
pub const DEFAULT_ELEVATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause inserted between successive elevation queries.
pub const DEFAULT_RATE_LIMIT_PAUSE: Duration = Duration::from_millis(100);

/// Size of the chunks written while streaming a download.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(8192) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

const CACHE_DIR_NAME: &str = "gnisdata";

/// Resolve the per-user cache directory (`~/.cache/gnisdata` on Linux).
///
/// Falls back to `./.cache/gnisdata` when the platform reports no cache
/// directory.
#[must_use]
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(CACHE_DIR_NAME)
}

/// Settings for downloads, caching, and elevation lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnisConfig {
    /// Base URL the archive file name is appended to. Ends with `/`.
    pub archive_base_url: String,
    /// Elevation point query endpoint.
    pub elevation_url: String,
    /// Cache root used when callers do not name one.
    pub cache_root: PathBuf,
    /// Timeout for a single archive download.
    pub download_timeout: Duration,
    /// Timeout for a single elevation query.
    pub elevation_timeout: Duration,
    /// Streaming chunk size in bytes.
    pub chunk_size: NonZeroUsize,
    /// Pause between consecutive elevation queries.
    pub rate_limit_pause: Duration,
    /// User agent header value.
    pub user_agent: String,
}

impl Default for GnisConfig {
    fn default() -> Self {
        Self {
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_owned(),
            elevation_url: DEFAULT_ELEVATION_URL.to_owned(),
            cache_root: default_cache_root(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            elevation_timeout: DEFAULT_ELEVATION_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            rate_limit_pause: DEFAULT_RATE_LIMIT_PAUSE,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl GnisConfig {
    /// Override the archive base URL. A trailing `/` is appended if missing.
    #[must_use]
    pub fn with_archive_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.archive_base_url = url;
        self
    }

    /// Override the elevation endpoint.
    #[must_use]
    pub fn with_elevation_url(mut self, url: impl Into<String>) -> Self {
        self.elevation_url = url.into();
        self
    }

    /// Override the default cache root.
    #[must_use]
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Override the download timeout.
    #[must_use]
    pub const fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Override the elevation timeout.
    #[must_use]
    pub const fn with_elevation_timeout(mut self, timeout: Duration) -> Self {
        self.elevation_timeout = timeout;
        self
    }

    /// Override the streaming chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Override the pause between elevation queries.
    #[must_use]
    pub const fn with_rate_limit_pause(mut self, pause: Duration) -> Self {
        self.rate_limit_pause = pause;
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_service_contract() {
        let config = GnisConfig::default();
        assert!(config.archive_base_url.starts_with("https://"));
        assert!(config.archive_base_url.ends_with('/'));
        assert_eq!(config.download_timeout, Duration::from_secs(30));
        assert_eq!(config.elevation_timeout, Duration::from_secs(10));
        assert_eq!(config.chunk_size.get(), 8192);
        assert_eq!(config.rate_limit_pause, Duration::from_millis(100));
        assert!(config.cache_root.ends_with("gnisdata"));
    }

    #[rstest]
    #[case("http://mirror.local/gnis", "http://mirror.local/gnis/")]
    #[case("http://mirror.local/gnis/", "http://mirror.local/gnis/")]
    fn base_url_gains_trailing_slash(#[case] input: &str, #[case] expected: &str) {
        let config = GnisConfig::default().with_archive_base_url(input);
        assert_eq!(config.archive_base_url, expected);
    }

    #[rstest]
    fn overrides_leave_other_fields_untouched() {
        let base = GnisConfig::default();
        let tuned = base
            .clone()
            .with_rate_limit_pause(Duration::ZERO)
            .with_user_agent("test/1.0");
        assert_eq!(tuned.rate_limit_pause, Duration::ZERO);
        assert_eq!(tuned.user_agent, "test/1.0");
        assert_eq!(tuned.elevation_url, base.elevation_url);
        assert_eq!(tuned.cache_root, base.cache_root);
    }
}
