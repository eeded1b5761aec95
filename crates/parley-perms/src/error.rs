//! Error types for the permissions module.

use std::fmt;

use parley_core::Uuid;
use thiserror::Error;

use crate::flags::PermissionFlags;

/// Why a permission change was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// The invoker does not hold modify-security.
    MissingModifySecurity,
    /// The invoker tried to change its own entry.
    SelfModification,
    /// The target's effective permissions are not below the invoker's.
    InsufficientRank,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ViolationKind::MissingModifySecurity => "no access to set permissions",
            ViolationKind::SelfModification => "cannot change own permissions",
            ViolationKind::InsufficientRank => "target has equal or higher permissions",
        };
        f.write_str(msg)
    }
}

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// A permission change was refused.
    #[error("security violation: {kind} (invoker {invoker}, target {target})")]
    SecurityViolation {
        kind: ViolationKind,
        invoker: Uuid,
        target: Uuid,
    },

    /// A user tried an action its effective permissions do not cover.
    #[error("security violation: user {user} lacks {required} in conversation {conversation}")]
    MissingPermissions {
        user: Uuid,
        conversation: Uuid,
        required: PermissionFlags,
    },
}

impl PermsError {
    /// The rejection reason for a refused permission change.
    pub fn violation_kind(&self) -> Option<ViolationKind> {
        match self {
            PermsError::SecurityViolation { kind, .. } => Some(*kind),
            PermsError::MissingPermissions { .. } => None,
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
