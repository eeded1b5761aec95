//! Per-conversation security state.
//!
//! A descriptor holds an implicit baseline that applies to everyone and a
//! map of explicit per-user overrides. The conversation owner is given the
//! creator preset when the descriptor is built.

use std::collections::BTreeMap;

use parley_core::Uuid;
use serde::{Deserialize, Serialize};

use crate::error::{PermsError, Result, ViolationKind};
use crate::flags::PermissionFlags;

/// Security descriptor owned by a conversation header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDescriptor {
    /// Baseline for users without an explicit entry.
    implicit: PermissionFlags,

    /// Explicit overrides by user.
    explicit: BTreeMap<Uuid, PermissionFlags>,
}

impl SecurityDescriptor {
    /// Build a descriptor granting `owner` the creator preset.
    pub fn new(owner: Uuid) -> Self {
        let mut explicit = BTreeMap::new();
        explicit.insert(owner, PermissionFlags::CREATOR);
        Self {
            implicit: PermissionFlags::NONE,
            explicit,
        }
    }

    /// The permissions enforced for `id`: its explicit entry, or the
    /// implicit baseline.
    pub fn effective_permissions(&self, id: &Uuid) -> PermissionFlags {
        self.explicit.get(id).copied().unwrap_or(self.implicit)
    }

    /// Whether `id` holds every flag in `flags`.
    pub fn has_flags(&self, id: &Uuid, flags: PermissionFlags) -> bool {
        self.effective_permissions(id).contains(flags)
    }

    /// Give `target` an explicit entry of `flags`.
    pub fn set_permissions(
        &mut self,
        invoker: &Uuid,
        target: &Uuid,
        flags: PermissionFlags,
    ) -> Result<()> {
        self.check_change(invoker, target)?;
        self.explicit.insert(*target, flags);
        Ok(())
    }

    /// Drop `target`'s explicit entry, reverting it to the baseline.
    pub fn reset_permissions(&mut self, invoker: &Uuid, target: &Uuid) -> Result<()> {
        self.check_change(invoker, target)?;
        self.explicit.remove(target);
        Ok(())
    }

    pub fn implicit_permissions(&self) -> PermissionFlags {
        self.implicit
    }

    pub fn explicit_permissions(&self, id: &Uuid) -> Option<PermissionFlags> {
        self.explicit.get(id).copied()
    }

    /// Explicit entries, ordered by user id.
    pub fn explicit_entries(&self) -> impl Iterator<Item = (Uuid, PermissionFlags)> + '_ {
        self.explicit.iter().map(|(id, flags)| (*id, *flags))
    }

    /// Rules for any change to `target` requested by `invoker`.
    ///
    /// Rank compares effective masks as signed integers.
    fn check_change(&self, invoker: &Uuid, target: &Uuid) -> Result<()> {
        let violation = |kind| PermsError::SecurityViolation {
            kind,
            invoker: *invoker,
            target: *target,
        };

        if !self.has_flags(invoker, PermissionFlags::MODIFY_SECURITY) {
            return Err(violation(ViolationKind::MissingModifySecurity));
        }
        if invoker == target {
            return Err(violation(ViolationKind::SelfModification));
        }
        if self.effective_permissions(invoker).rank() <= self.effective_permissions(target).rank() {
            return Err(violation(ViolationKind::InsufficientRank));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OWNER: Uuid = Uuid::new(1, 0, 1);
    const ALICE: Uuid = Uuid::new(2, 0, 2);
    const BOB: Uuid = Uuid::new(3, 0, 3);

    fn kind(result: Result<()>) -> Option<ViolationKind> {
        result.err().and_then(|e| e.violation_kind())
    }

    #[test]
    fn test_owner_gets_creator() {
        let descriptor = SecurityDescriptor::new(OWNER);
        assert_eq!(descriptor.effective_permissions(&OWNER), PermissionFlags::CREATOR);
        assert_eq!(descriptor.effective_permissions(&ALICE), PermissionFlags::NONE);
        assert!(descriptor.has_flags(&OWNER, PermissionFlags::OWNER));
        assert!(!descriptor.has_flags(&ALICE, PermissionFlags::VIEW_MESSAGES));
        assert!(descriptor.has_flags(&ALICE, PermissionFlags::NONE));
    }

    #[test]
    fn test_owner_grants_member() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        descriptor
            .set_permissions(&OWNER, &ALICE, PermissionFlags::MEMBER)
            .unwrap();
        assert!(descriptor.has_flags(&ALICE, PermissionFlags::ADD_MESSAGES));
        assert!(!descriptor.has_flags(&ALICE, PermissionFlags::DELETE_MESSAGES));
    }

    #[test]
    fn test_without_modify_security_fails_and_leaves_map() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        descriptor
            .set_permissions(&OWNER, &ALICE, PermissionFlags::MEMBER)
            .unwrap();
        let before = descriptor.clone();

        assert_eq!(
            kind(descriptor.set_permissions(&ALICE, &BOB, PermissionFlags::MEMBER)),
            Some(ViolationKind::MissingModifySecurity)
        );
        assert_eq!(
            kind(descriptor.reset_permissions(&BOB, &ALICE)),
            Some(ViolationKind::MissingModifySecurity)
        );
        assert_eq!(descriptor, before);
    }

    #[test]
    fn test_self_modification_rejected() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        assert_eq!(
            kind(descriptor.set_permissions(&OWNER, &OWNER, PermissionFlags::NONE)),
            Some(ViolationKind::SelfModification)
        );
        assert_eq!(
            kind(descriptor.reset_permissions(&OWNER, &OWNER)),
            Some(ViolationKind::SelfModification)
        );
        assert_eq!(descriptor.effective_permissions(&OWNER), PermissionFlags::CREATOR);
    }

    #[test]
    fn test_equal_rank_cannot_elevate() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        descriptor
            .set_permissions(&OWNER, &ALICE, PermissionFlags::OWNER)
            .unwrap();
        descriptor
            .set_permissions(&OWNER, &BOB, PermissionFlags::OWNER)
            .unwrap();

        assert_eq!(
            kind(descriptor.set_permissions(&ALICE, &BOB, PermissionFlags::CREATOR)),
            Some(ViolationKind::InsufficientRank)
        );
        assert_eq!(descriptor.effective_permissions(&BOB), PermissionFlags::OWNER);
    }

    #[test]
    fn test_nobody_outranks_creator() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        descriptor
            .set_permissions(&OWNER, &ALICE, PermissionFlags::OWNER)
            .unwrap();
        assert_eq!(
            kind(descriptor.reset_permissions(&ALICE, &OWNER)),
            Some(ViolationKind::InsufficientRank)
        );
        assert_eq!(descriptor.explicit_permissions(&OWNER), Some(PermissionFlags::CREATOR));
    }

    #[test]
    fn test_top_bit_grant_cannot_remove_creator() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        let all = PermissionFlags::from_bits(u32::MAX);
        descriptor.set_permissions(&OWNER, &ALICE, all).unwrap();

        assert_eq!(
            kind(descriptor.reset_permissions(&ALICE, &OWNER)),
            Some(ViolationKind::InsufficientRank)
        );
        assert_eq!(
            kind(descriptor.set_permissions(&ALICE, &OWNER, PermissionFlags::NONE)),
            Some(ViolationKind::InsufficientRank)
        );
        // A negative rank cannot even touch a user on the baseline.
        assert_eq!(
            kind(descriptor.set_permissions(&ALICE, &BOB, PermissionFlags::MEMBER)),
            Some(ViolationKind::InsufficientRank)
        );
        assert_eq!(descriptor.explicit_permissions(&OWNER), Some(PermissionFlags::CREATOR));

        // The creator still outranks it and can take it back.
        descriptor.reset_permissions(&OWNER, &ALICE).unwrap();
        assert_eq!(descriptor.explicit_permissions(&ALICE), None);
    }

    #[test]
    fn test_reset_reverts_to_baseline() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        descriptor
            .set_permissions(&OWNER, &ALICE, PermissionFlags::MEMBER)
            .unwrap();
        descriptor.reset_permissions(&OWNER, &ALICE).unwrap();
        assert_eq!(descriptor.explicit_permissions(&ALICE), None);
        assert_eq!(
            descriptor.effective_permissions(&ALICE),
            descriptor.implicit_permissions()
        );
    }

    #[test]
    fn test_rank_is_integer_not_subset() {
        // MODIFY_SECURITY | VIEW (0b100001) outranks OWNER-minus-modify
        // (0b011111) numerically even though it holds fewer flags.
        let mut descriptor = SecurityDescriptor::new(OWNER);
        let narrow = PermissionFlags::MODIFY_SECURITY | PermissionFlags::VIEW_MESSAGES;
        let wide = PermissionFlags::from_bits(0b01_1111);
        descriptor.set_permissions(&OWNER, &ALICE, narrow).unwrap();
        descriptor.set_permissions(&OWNER, &BOB, wide).unwrap();

        descriptor
            .set_permissions(&ALICE, &BOB, PermissionFlags::NONE)
            .unwrap();
        assert_eq!(descriptor.effective_permissions(&BOB), PermissionFlags::NONE);
    }

    #[test]
    fn test_explicit_entries_sorted() {
        let mut descriptor = SecurityDescriptor::new(BOB);
        descriptor
            .set_permissions(&BOB, &ALICE, PermissionFlags::MEMBER)
            .unwrap();
        let ids: Vec<Uuid> = descriptor.explicit_entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![ALICE, BOB]);
    }

    #[test]
    fn test_serde_roundtrip_keeps_overrides() {
        let mut descriptor = SecurityDescriptor::new(OWNER);
        descriptor
            .set_permissions(&OWNER, &ALICE, PermissionFlags::MEMBER)
            .unwrap();
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: SecurityDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }

    proptest! {
        #[test]
        fn test_has_flags_matches_mask(bits in any::<u32>(), mask in any::<u32>()) {
            let mut descriptor = SecurityDescriptor::new(OWNER);
            let flags = PermissionFlags::from_bits(bits);
            descriptor.set_permissions(&OWNER, &ALICE, flags).unwrap();
            let mask = PermissionFlags::from_bits(mask);
            prop_assert_eq!(
                descriptor.has_flags(&ALICE, mask),
                flags.bits() & mask.bits() == mask.bits()
            );
        }

        #[test]
        fn test_creator_entry_survives_any_grant(bits in any::<u32>()) {
            let mut descriptor = SecurityDescriptor::new(OWNER);
            descriptor
                .set_permissions(&OWNER, &ALICE, PermissionFlags::from_bits(bits))
                .unwrap();
            prop_assert!(descriptor.reset_permissions(&ALICE, &OWNER).is_err());
            prop_assert!(descriptor
                .set_permissions(&ALICE, &OWNER, PermissionFlags::NONE)
                .is_err());
            prop_assert_eq!(descriptor.explicit_permissions(&OWNER), Some(PermissionFlags::CREATOR));
        }
    }
}
