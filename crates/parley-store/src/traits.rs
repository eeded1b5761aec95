//! Read-only access to an ordered store.
//!
//! Read paths (views, snapshots) receive a `StoreAccessor`
//! borrow so they cannot insert or remove.

use crate::ordered::Values;

/// Lookups and ordered scans over a store.
///
/// Every scan is lazy, finite, and yields values in key order. A bound that
/// no key satisfies produces an empty scan, never an error.
pub trait StoreAccessor<K, V> {
    /// The first value stored under `key`.
    fn first(&self, key: &K) -> Option<&V>;

    /// Every value.
    fn all(&self) -> Values<'_, K, V>;

    /// Every value stored under exactly `key`, in insertion order.
    fn at(&self, key: &K) -> Values<'_, K, V>;

    /// Values with keys `>= start`.
    fn after(&self, start: &K) -> Values<'_, K, V>;

    /// Values with keys `<= end`.
    fn before(&self, end: &K) -> Values<'_, K, V>;

    /// Values with keys in `[start, end]`.
    fn range(&self, start: &K, end: &K) -> Values<'_, K, V>;

    /// Number of stored values, duplicates included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
