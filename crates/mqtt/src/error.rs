//! MQTT engine error types.

use thiserror::Error;

/// Result type for MQTT operations.
pub type Result<T> = std::result::Result<T, MqttError>;

/// Errors that can occur while setting up or driving the MQTT engine.
#[derive(Debug, Error)]
pub enum MqttError {
    /// A required config key is missing or invalid
    #[error(transparent)]
    Config(#[from] tapir_config::ConfigError),

    /// The broker URL could not be used
    #[error("invalid MQTT server '{server}': {message}")]
    InvalidServer { server: String, message: String },

    /// Reading a key or certificate file failed
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A key file did not hold a usable P-256 key
    #[error("invalid key in '{path}': {message}")]
    Key { path: String, message: String },

    /// A certificate file did not hold a usable certificate
    #[error("invalid certificate in '{path}': {message}")]
    Certificate { path: String, message: String },

    /// A JWS token was malformed or its signature did not verify
    #[error("jws: {0}")]
    Jws(String),

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pub topic registered on an engine without publish support
    #[error("engine {engine} cannot publish (topic {topic})")]
    NoPubCapability { engine: String, topic: String },

    /// Sub topic registered on an engine without subscribe support
    #[error("engine {engine} cannot subscribe (topic {topic})")]
    NoSubCapability { engine: String, topic: String },

    /// Signing requested without a key
    #[error("topic {0} is signed but no signing key was given")]
    MissingSigningKey(String),

    /// Validation requested without a key
    #[error("topic {0} is validated but no validator key was given")]
    MissingValidatorKey(String),

    /// The engine task has exited
    #[error("MQTT engine is not running")]
    EngineGone,
}

impl MqttError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn key(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Key {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn certificate(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Certificate {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}
