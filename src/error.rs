// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;
use std::path::Path;

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

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A source page could not be fetched or parsed
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Webhook delivery failed
    #[error("Notification error: {0}")]
    Notify(String),

    /// The seen-set file could not be written
    #[error("State write error for {path}: {message}")]
    StateWrite { path: String, message: String },

    /// Another run holds the state lock
    #[error("State file is locked by another run: {path}")]
    Locked { path: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a source URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Create a state write error.
    pub fn state_write(path: &Path, message: impl fmt::Display) -> Self {
        Self::StateWrite {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a lock contention error.
    pub fn locked(path: &Path) -> Self {
        Self::Locked {
            path: path.display().to_string(),
        }
    }
}
