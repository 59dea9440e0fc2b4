//! Client configuration
//!
//! Every setting has a default, so a config file only needs the values it
//! changes. The file is JSON and is looked up in the XDG config directory
//! (`~/.config/clara/config.json` on Linux) unless a path is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::normalize::Normalizer;
use crate::data::RetryPolicy;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Reading the config file failed
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ClientConfig`]
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the MangaDex client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Cover CDN root, without trailing slash
    pub cover_base_url: String,
    pub user_agent: String,
    /// Items per list page
    pub page_size: u32,
    /// Timeout for each request attempt
    pub request_timeout_ms: u64,
    /// Attempts per request, including the first
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Minimum gap between two dispatched requests
    pub min_request_interval_ms: u64,
    pub cache_ttl_secs: u64,
    /// Maximum number of cached responses
    pub cache_capacity: usize,
    pub health_timeout_ms: u64,
    /// Preferred languages for titles, descriptions and chapters, most preferred first
    pub languages: Vec<String>,
    /// Content ratings included in listings
    pub content_ratings: Vec<String>,
    /// How often expired cache entries are swept; 0 disables the sweeper
    pub sweep_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mangadex.org".to_string(),
            cover_base_url: "https://uploads.mangadex.org/covers".to_string(),
            user_agent: format!("clara/{}", env!("CARGO_PKG_VERSION")),
            page_size: 20,
            request_timeout_ms: 10_000,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 8_000,
            min_request_interval_ms: 250,
            cache_ttl_secs: 300,
            cache_capacity: 200,
            health_timeout_ms: 5_000,
            languages: vec!["en".to_string(), "ja-ro".to_string(), "ja".to_string()],
            content_ratings: vec!["safe".to_string(), "suggestive".to_string()],
            sweep_interval_secs: 60,
        }
    }
}

impl ClientConfig {
    /// Loads configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present, otherwise defaults are returned.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::load_from_path(path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_path(&path)?,
                None => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/clara/config.json`, if a home directory can be determined
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "clara")?;
        Some(project_dirs.config_dir().join("config.json"))
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects settings the client cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.health_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "health_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.languages.is_empty() {
            return Err(ConfigError::Invalid(
                "languages must name at least one language".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_millis(self.request_timeout_ms),
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer {
            languages: self.languages.clone(),
            cover_base_url: self.cover_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Sweep interval, or `None` when sweeping is disabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Language used to filter chapter feeds
    pub fn chapter_language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or("en")
    }
}
