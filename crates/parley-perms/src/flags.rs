//! Permission flags and presets.
//!
//! Each flag is a single bit. Presets compose flags; `FULL_ACCESS` sets every
//! bit of the positive `i32` range and is what a conversation's creator gets.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A permission bitmask.
///
/// Ordering compares [`PermissionFlags::rank`], not flag subsets. Privilege
/// checks in [`crate::SecurityDescriptor`] rely on that ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionFlags(u32);

impl PermissionFlags {
    pub const NONE: Self = Self(0);
    pub const VIEW_MESSAGES: Self = Self(1 << 0);
    pub const ADD_MESSAGES: Self = Self(1 << 1);
    pub const DELETE_MESSAGES: Self = Self(1 << 2);
    pub const EDIT_MESSAGES: Self = Self(1 << 3);
    pub const READ_SECURITY: Self = Self(1 << 4);
    pub const MODIFY_SECURITY: Self = Self(1 << 5);
    pub const FULL_ACCESS: Self = Self(0x7FFF_FFFF);

    // Presets
    pub const MEMBER: Self = Self(Self::VIEW_MESSAGES.0 | Self::ADD_MESSAGES.0);
    pub const OWNER: Self = Self(
        Self::MEMBER.0
            | Self::DELETE_MESSAGES.0
            | Self::EDIT_MESSAGES.0
            | Self::READ_SECURITY.0
            | Self::MODIFY_SECURITY.0,
    );
    pub const CREATOR: Self = Self::FULL_ACCESS;

    const NAMED: [(Self, &'static str); 6] = [
        (Self::VIEW_MESSAGES, "VIEW_MESSAGES"),
        (Self::ADD_MESSAGES, "ADD_MESSAGES"),
        (Self::DELETE_MESSAGES, "DELETE_MESSAGES"),
        (Self::EDIT_MESSAGES, "EDIT_MESSAGES"),
        (Self::READ_SECURITY, "READ_SECURITY"),
        (Self::MODIFY_SECURITY, "MODIFY_SECURITY"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// The mask read as a signed 32-bit integer.
    ///
    /// A mask with the top bit set is negative and ranks below `NONE`, so
    /// nothing can outrank `FULL_ACCESS`.
    pub const fn rank(&self) -> i32 {
        self.0 as i32
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Ord for PermissionFlags {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for PermissionFlags {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BitOr for PermissionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PermissionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PermissionFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<u32> for PermissionFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::FULL_ACCESS {
            return f.write_str("FULL_ACCESS");
        }
        if self.is_empty() {
            return f.write_str("NONE");
        }

        let mut rest = self.0;
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                rest &= !flag.0;
                first = false;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{:#x}", rest)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionFlags({})", self)
    }
}
