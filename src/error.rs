// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
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

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Notification input was not a list of mappings
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A snapshot could not be loaded or is not a comparable value
    #[error("Invalid snapshot {source_name}: {message}")]
    InvalidSnapshot {
        source_name: String,
        message: String,
    },

    /// Structure nested deeper than the configured limit
    #[error("Depth limit of {limit} exceeded at {path}")]
    DepthExceeded { limit: usize, path: String },

    /// Exclusion pattern could not be parsed
    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// The remote API answered with an exception payload
    #[error("API error from {function}: {message}")]
    Api { function: String, message: String },

    /// Fetching an entity failed
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed input error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    /// Create an invalid snapshot error.
    pub fn invalid_snapshot(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidSnapshot {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create an exclusion pattern error.
    pub fn pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create an API error for a remote function.
    pub fn api(function: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Api {
            function: function.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
