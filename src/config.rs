// src/config.rs

//! Sync run configuration.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// How much data to gather per issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// CSV list fields only; no detail batches are fetched.
    List,
    /// Full XML detail, no change history.
    Issue,
    /// Full XML detail plus the change-history table.
    #[default]
    Change,
}

impl FromStr for DetailLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "list" => Ok(Self::List),
            "issue" => Ok(Self::Issue),
            "change" => Ok(Self::Change),
            other => Err(AppError::config(format!(
                "unknown detail level '{other}' (expected list, issue or change)"
            ))),
        }
    }
}

/// Root sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Tracker URL, including an optional product filter in the query
    pub url: String,

    /// Number of issues requested per detail query
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Detail level: list, issue or change
    #[serde(default)]
    pub detail: DetailLevel,

    /// Seed the watermark from the external state store
    #[serde(default = "defaults::yes")]
    pub incremental: bool,

    /// Rebuild issues from the local cache instead of the network
    #[serde(default)]
    pub replay: bool,

    /// Write fetched raw data to the local cache
    #[serde(default = "defaults::yes")]
    pub cache: bool,

    /// Directory for the local cache
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    /// HTTP behavior settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl SyncConfig {
    /// Create a configuration for the given tracker URL with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            batch_size: defaults::batch_size(),
            detail: DetailLevel::default(),
            incremental: true,
            replay: false,
            cache: true,
            cache_dir: defaults::cache_dir(),
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::config("url is empty"));
        }
        if self.batch_size == 0 {
            return Err(AppError::config("batch_size must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

mod defaults {
    pub fn batch_size() -> usize {
        200
    }
    pub fn yes() -> bool {
        true
    }
    pub fn cache_dir() -> String {
        "cache".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bugsync/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }
}
