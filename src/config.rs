//! Downloader configuration.
//!
//! Settings can come from a TOML file; every field is optional and falls
//! back to its default. The CLI layers its flags on top.
//!
//! ```toml
//! output_dir = "music"
//! quality = "320"
//! max_concurrency = 8
//! timeout_secs = 15
//! embed_tags = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::{API_BASE_URL, ARTIST_PAGE_SIZE, DEFAULT_TIMEOUT};
use crate::error::{Result, SaavnError};
use crate::models::Quality;
use crate::orchestrator::DEFAULT_MAX_CONCURRENCY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Root of the `{artist}/{album}/{title}.{ext}` layout.
    pub output_dir: PathBuf,
    pub quality: Quality,
    /// Simultaneous track downloads.
    pub max_concurrency: usize,
    /// Metadata request timeout, also used as the media connect timeout.
    pub timeout_secs: u64,
    /// Extension for saved files, without the dot.
    pub file_extension: String,
    pub embed_tags: bool,
    /// Full URL of the provider's `api.php`.
    pub api_base_url: String,
    pub artist_page_size: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            quality: Quality::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            file_extension: "m4a".to_string(),
            embed_tags: true,
            api_base_url: API_BASE_URL.to_string(),
            artist_page_size: ARTIST_PAGE_SIZE,
        }
    }
}

impl DownloadConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: DownloadConfig =
            toml::from_str(source).map_err(|e| SaavnError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let source = std::fs::read_to_string(path)
            .map_err(|e| SaavnError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&source)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(SaavnError::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.artist_page_size == 0 {
            return Err(SaavnError::Config("artist_page_size must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(SaavnError::Config("timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DownloadConfig::default();
        assert_eq!(config.max_concurrency, 20);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.quality, Quality::Kbps320);
        assert_eq!(config.artist_page_size, 10);
        assert_eq!(config.file_extension, "m4a");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DownloadConfig::from_toml(
            r#"
            output_dir = "music"
            quality = "160"
            max_concurrency = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("music"));
        assert_eq!(config.quality, Quality::Kbps160);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.embed_tags);
        assert_eq!(config.api_base_url, API_BASE_URL);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = DownloadConfig::from_toml("max_concurrency = 0").unwrap_err();
        assert!(matches!(err, SaavnError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_quality() {
        assert!(DownloadConfig::from_toml("quality = \"128\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rusaavn.toml");
        std::fs::write(&path, "embed_tags = false\ntimeout_secs = 3\n").unwrap();

        let config = DownloadConfig::load(&path).unwrap();
        assert!(!config.embed_tags);
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }
}
