//! Configuration - `ferry.toml`
//!
//! Every section is optional; an empty file gives the defaults.
//!
//! ```toml
//! storage_key = "sync_queue"
//!
//! [retry]
//! max_retries = 3
//! on_exhausted = "keep"        # keep | evict
//! on_unknown_kind = "park"     # park | consume_retry
//!
//! [remote]
//! base_url = "http://localhost:5000/api"
//! token = "..."
//! timeout_secs = 30
//!
//! [connectivity]
//! probe_url = "http://localhost:5000/api"   # defaults to remote.base_url
//! probe_interval_secs = 5
//!
//! [auto_sync]
//! retry_interval_secs = 60     # omit: drain only when connectivity comes back
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::{DEFAULT_STORAGE_KEY, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    /// Key the queue is stored under.
    pub storage_key: String,
    pub retry: RetryPolicy,
    pub remote: RemoteConfig,
    pub connectivity: ConnectivityConfig,
    pub auto_sync: AutoSyncConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Sent as a bearer token when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSyncConfig {
    /// Also drain on this period while online.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval_secs: Option<u64>,
}

impl FerryConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".to_string()));
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_retries must be at least 1".to_string(),
            ));
        }
        let urls = [
            ("remote.base_url", Some(self.remote.base_url.as_str())),
            ("connectivity.probe_url", self.connectivity.probe_url.as_deref()),
        ];
        for (name, url) in urls {
            let Some(url) = url else { continue };
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.connectivity.probe_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "connectivity.probe_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.auto_sync.retry_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "auto_sync.retry_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// URL whose reachability decides online/offline.
    pub fn probe_url(&self) -> &str {
        self.connectivity
            .probe_url
            .as_deref()
            .unwrap_or(&self.remote.base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity.probe_interval_secs)
    }

    pub fn retry_interval(&self) -> Option<Duration> {
        self.auto_sync.retry_interval_secs.map(Duration::from_secs)
    }
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            retry: RetryPolicy::default(),
            remote: RemoteConfig::default(),
            connectivity: ConnectivityConfig::default(),
            auto_sync: AutoSyncConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            probe_interval_secs: 5,
        }
    }
}
