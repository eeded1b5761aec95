//! # Parley Testkit
//!
//! Testing utilities for Parley.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a controller wired to deterministic identifiers and a
//!   manual clock, plus chain consistency checks
//! - **Generators**: Proptest strategies for identifiers, permission masks,
//!   and random chain operations
//!
//! ## Test Fixtures
//!
//! ```rust
//! use parley_testkit::ChatFixture;
//!
//! let mut fixture = ChatFixture::new();
//! let ada = fixture.user("ada");
//! let general = fixture.conversation(&ada, "general");
//! let posted = fixture.post(&ada, &general, &["one", "two"]);
//!
//! assert_eq!(fixture.chain(general.id), vec![posted[0].id, posted[1].id]);
//! fixture.assert_chain_consistent(general.id);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use parley_testkit::generators::{chain_ops, ChainOp};
//!
//! proptest! {
//!     #[test]
//!     fn chain_stays_consistent(ops in chain_ops(64)) {
//!         // apply ops to a ChatFixture, then assert_chain_consistent
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{shuffled_keys, ChatFixture, ManualClock, ScriptedUuidGenerator, SequenceUuidGenerator};
pub use generators::ChainOp;
