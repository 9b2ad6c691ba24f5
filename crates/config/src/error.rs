//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A key the current command needs is not set
    #[error("missing config key: {0}")]
    MissingKey(String),

    /// Validation error - invalid value
    #[error("config key '{field}' has invalid value: {message}")]
    InvalidValue {
        /// Dotted key path
        field: String,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a MissingKey error
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey(key.into())
    }

    /// Create an InvalidValue error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
