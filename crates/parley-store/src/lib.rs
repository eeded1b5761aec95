//! # Parley Store
//!
//! The ordered key/value container every Parley entity lives in.
//!
//! ## Overview
//!
//! [`OrderedStore`] combines a balanced index (`BTreeMap`) with a linked
//! chain threaded through all values in ascending key order. The index
//! answers exact, floor, and ceiling lookups in O(log n); scans follow the
//! chain, so duplicate keys are all visited in insertion order.
//!
//! ## Key Types
//!
//! - [`OrderedStore`] - The container
//! - [`StoreAccessor`] - Read-only lookups and ordered scans
//! - [`Values`] - Lazy, restartable scan returned by every range operator
//!
//! ## Usage
//!
//! ```rust
//! use parley_store::{OrderedStore, StoreAccessor};
//!
//! let mut store = OrderedStore::new();
//! store.insert(5, "A");
//! store.insert(3, "B");
//! store.insert(3, "C");
//! store.insert(7, "D");
//!
//! let all: Vec<_> = store.all().copied().collect();
//! assert_eq!(all, vec!["B", "C", "A", "D"]);
//! assert_eq!(store.first(&3), Some(&"B"));
//!
//! store.remove(&3);
//! assert_eq!(store.first(&3), Some(&"C"));
//! ```
//!
//! ## Design Notes
//!
//! - **Duplicate keys**: only the first node of an equal-key run is indexed
//! - **Asymmetric cost**: insert/lookup O(log n), remove O(n)
//! - **No pointers**: nodes are arena slots linked by index

pub mod ordered;
pub mod traits;

pub use ordered::{OrderedStore, Values};
pub use traits::StoreAccessor;
