// src/error.rs

//! Unified error handling for the sync engine.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// XML parsing failed
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Version probe failed; without a version the URL dialect is unknown
    #[error("Version probe failed: {0}")]
    VersionProbe(String),

    /// A watermark string did not parse as a timestamp
    #[error("Invalid watermark '{0}': not a parseable timestamp")]
    Watermark(String),

    /// A row or document failed to parse
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a version probe error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::VersionProbe(message.into())
    }

    /// Create a watermark error.
    pub fn watermark(value: impl Into<String>) -> Self {
        Self::Watermark(value.into())
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
