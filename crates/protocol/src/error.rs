//! Protocol error types

use thiserror::Error;

/// Errors that can occur when building protocol values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Tag name is not in the list of defined tags
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// Component status string is not one of ok, warn, fail
    #[error("invalid status: {0} (must be ok, warn or fail)")]
    InvalidStatus(String),
}

impl ProtocolError {
    /// Create an unknown tag error
    #[inline]
    pub fn unknown_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTag(tag.into())
    }

    /// Create an invalid status error
    #[inline]
    pub fn invalid_status(status: impl Into<String>) -> Self {
        Self::InvalidStatus(status.into())
    }
}
