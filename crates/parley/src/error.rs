//! Error types for Parley.

use std::path::PathBuf;

use parley_core::Uuid;
use parley_perms::PermsError;
use thiserror::Error;

/// Errors raised while writing or loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem error.
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed snapshot contents.
    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot refers to entities it does not contain.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur during chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Permission error.
    #[error("permission error: {0}")]
    Security(#[from] PermsError),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// Snapshot error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The service task is no longer running.
    #[error("chat service closed")]
    ServiceClosed,
}

impl ChatError {
    pub(crate) fn user_not_found(id: Uuid) -> Self {
        ChatError::NotFound { kind: "user", id }
    }

    pub(crate) fn conversation_not_found(id: Uuid) -> Self {
        ChatError::NotFound {
            kind: "conversation",
            id,
        }
    }

    pub(crate) fn message_not_found(id: Uuid) -> Self {
        ChatError::NotFound { kind: "message", id }
    }

    /// Whether this rejection came from a permission check.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, ChatError::Security(_))
    }

    /// Whether a referenced entity was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::NotFound { .. })
    }
}

/// Result type for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
