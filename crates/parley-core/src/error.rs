//! Error types for Parley Core.

use thiserror::Error;

/// Core errors that can occur when handling identifiers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier {input:?}: {reason}")]
    InvalidIdentifier { input: String, reason: String },
}

impl CoreError {
    pub(crate) fn invalid_identifier(input: &str, reason: impl Into<String>) -> Self {
        CoreError::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
