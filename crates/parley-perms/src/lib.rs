//! # Parley Permissions
//!
//! Per-conversation access control.
//!
//! ## Overview
//!
//! Every conversation owns a [`SecurityDescriptor`]: an implicit baseline
//! that applies to everyone, plus explicit per-user overrides. A user's
//! effective permissions are its override if present, otherwise the baseline.
//!
//! ## Key Concepts
//!
//! - **Flags**: single-bit capabilities (view, add, delete, edit, read
//!   security, modify security) combined into a [`PermissionFlags`] mask
//! - **Presets**: `MEMBER`, `OWNER`, and `CREATOR` (full access)
//! - **Rank**: effective masks compare as integers; a change needs an
//!   invoker strictly above its target
//!
//! ## Usage
//!
//! ```rust
//! use parley_core::Uuid;
//! use parley_perms::{PermissionFlags, SecurityDescriptor};
//!
//! let owner = Uuid::new(1, 0, 1);
//! let guest = Uuid::new(2, 0, 2);
//!
//! let mut descriptor = SecurityDescriptor::new(owner);
//! descriptor
//!     .set_permissions(&owner, &guest, PermissionFlags::MEMBER)
//!     .unwrap();
//!
//! assert!(descriptor.has_flags(&guest, PermissionFlags::ADD_MESSAGES));
//! assert!(descriptor.set_permissions(&guest, &owner, PermissionFlags::NONE).is_err());
//! ```

pub mod descriptor;
pub mod error;
pub mod flags;

pub use descriptor::SecurityDescriptor;
pub use error::{PermsError, Result, ViolationKind};
pub use flags::PermissionFlags;
