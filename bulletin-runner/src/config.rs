//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration.
//! Precedence: CLI flags > environment > file > defaults.

use bulletin_core::data::HttpSettings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable overriding `store.database_url`.
pub const DATABASE_URL_ENV: &str = "BULLETINS_DATABASE_URL";

/// Upper bound on `source.max_retries`.
pub const MAX_PAGE_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Earliest trade date to ingest.
    pub cutoff_date: NaiveDate,
    pub source: SourceConfig,
    pub download: DownloadConfig,
    pub store: StoreConfig,
}

/// The exchange website.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub listing_path: String,
    pub page_ready_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Retries per listing page after the first attempt. 0 disables retrying.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Stop paginating after this many pages.
    pub max_pages: Option<u32>,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    pub dir: PathBuf,
    /// Concurrent per-link tasks. 1 runs links strictly in listing order.
    pub max_in_flight: usize,
    pub launch_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cutoff_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            source: SourceConfig::default(),
            download: DownloadConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://spimex.com".into(),
            listing_path: "/markets/oil_products/trades/results/".into(),
            page_ready_timeout_secs: 20,
            poll_interval_ms: 2_000,
            request_timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 500,
            max_pages: None,
            circuit_breaker_threshold: 3,
            circuit_breaker_cooldown_secs: 30 * 60,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("bulletins"),
            max_in_flight: 5,
            launch_interval_ms: 500,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bulletins.db".into(),
            max_connections: 5,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup` (a stand-in for the environment).
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.store.database_url = url;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.download.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "download.max_in_flight must be at least 1".into(),
            ));
        }
        if self.source.listing_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "source.listing_path must not be empty".into(),
            ));
        }
        if self.store.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.database_url must not be empty".into(),
            ));
        }
        if self.source.circuit_breaker_threshold == 0 {
            return Err(ConfigError::Invalid(
                "source.circuit_breaker_threshold must be at least 1".into(),
            ));
        }
        if self.source.max_retries > MAX_PAGE_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "source.max_retries must be at most {MAX_PAGE_RETRIES}"
            )));
        }
        self.base_url()?;
        Ok(())
    }

    /// The parsed `source.base_url`.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.source.base_url).map_err(|e| {
            ConfigError::Invalid(format!("source.base_url '{}': {e}", self.source.base_url))
        })
    }

    /// Connection settings for the page fetcher and document source.
    pub fn http_settings(&self) -> Result<HttpSettings, ConfigError> {
        let mut settings = HttpSettings::new(self.base_url()?);
        settings.listing_path = self.source.listing_path.clone();
        settings.request_timeout = Duration::from_secs(self.source.request_timeout_secs);
        settings.page_ready_timeout = Duration::from_secs(self.source.page_ready_timeout_secs);
        settings.poll_interval = Duration::from_millis(self.source.poll_interval_ms);
        settings.max_retries = self.source.max_retries;
        settings.retry_base_delay = Duration::from_millis(self.source.retry_base_delay_ms);
        settings.max_connections = self.download.max_in_flight;
        Ok(settings)
    }

    /// Minimum spacing between two per-link task launches.
    pub fn launch_interval(&self) -> Duration {
        Duration::from_millis(self.download.launch_interval_ms)
    }

    /// How long the origin stays blocked once the breaker opens.
    pub fn circuit_breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.source.circuit_breaker_cooldown_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(
            config.cutoff_date,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(config.download.max_in_flight, 5);
        assert_eq!(config.launch_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            cutoff_date = "2024-06-01"

            [download]
            max_in_flight = 1

            [source]
            max_pages = 3
            "#,
        )
        .unwrap();

        assert_eq!(
            config.cutoff_date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(config.download.max_in_flight, 1);
        assert_eq!(config.download.launch_interval_ms, 500);
        assert_eq!(config.source.max_pages, Some(3));
        assert_eq!(config.source.max_retries, 2);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml("cutoff_date = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_in_flight_is_invalid() {
        let mut config = PipelineConfig::default();
        config.download.max_in_flight = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_base_url_is_invalid() {
        let mut config = PipelineConfig::default();
        config.source.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn env_overrides_database_url() {
        let mut config = PipelineConfig::default();
        config.apply_env_from(|key| {
            (key == DATABASE_URL_ENV).then(|| "sqlite://override.db".to_string())
        });
        assert_eq!(config.store.database_url, "sqlite://override.db");

        config.apply_env_from(|_| Some("   ".to_string()));
        assert_eq!(config.store.database_url, "sqlite://override.db");
    }

    #[test]
    fn http_settings_follow_source_section() {
        let mut config = PipelineConfig::default();
        config.source.max_retries = 0;
        config.source.page_ready_timeout_secs = 5;
        let settings = config.http_settings().unwrap();
        assert_eq!(settings.max_retries, 0);
        assert_eq!(settings.page_ready_timeout, Duration::from_secs(5));
        assert_eq!(settings.base_url.as_str(), "https://spimex.com/");
    }

    #[test]
    fn excessive_retries_are_rejected() {
        let mut config = PipelineConfig::default();
        config.source.max_retries = MAX_PAGE_RETRIES;
        assert!(config.validate().is_ok());
        config.source.max_retries = 40;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
