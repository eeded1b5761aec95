//! Proptest generators for property-based testing.

use proptest::prelude::*;

use parley_core::Uuid;
use parley_perms::PermissionFlags;

/// Generate a Uuid other than NIL.
pub fn live_uuid() -> impl Strategy<Value = Uuid> {
    (any::<u64>(), any::<u32>(), any::<u32>())
        .prop_map(|(t, s, n)| Uuid::new(t, s, n))
        .prop_filter("not NIL", |id| !id.is_nil())
}

/// Generate an arbitrary mask, top bit included.
pub fn permission_flags() -> impl Strategy<Value = PermissionFlags> {
    any::<u32>().prop_map(PermissionFlags::from_bits)
}

/// Generate one of the presets or a single flag.
pub fn named_flags() -> impl Strategy<Value = PermissionFlags> {
    prop_oneof![
        Just(PermissionFlags::NONE),
        Just(PermissionFlags::VIEW_MESSAGES),
        Just(PermissionFlags::ADD_MESSAGES),
        Just(PermissionFlags::DELETE_MESSAGES),
        Just(PermissionFlags::READ_SECURITY),
        Just(PermissionFlags::MODIFY_SECURITY),
        Just(PermissionFlags::MEMBER),
        Just(PermissionFlags::OWNER),
        Just(PermissionFlags::CREATOR),
    ]
}

/// One step applied to a single conversation.
#[derive(Debug, Clone)]
pub enum ChainOp {
    /// Post a message.
    Post,
    /// Delete the message at this position (modulo chain length).
    Delete(usize),
    /// Delete a message id that is not in the chain.
    DeleteMissing,
}

pub fn chain_op() -> impl Strategy<Value = ChainOp> {
    prop_oneof![
        3 => Just(ChainOp::Post),
        2 => any::<usize>().prop_map(ChainOp::Delete),
        1 => Just(ChainOp::DeleteMissing),
    ]
}

/// Generate a sequence of up to `max_len` chain operations.
pub fn chain_ops(max_len: usize) -> impl Strategy<Value = Vec<ChainOp>> {
    prop::collection::vec(chain_op(), 0..=max_len)
}
