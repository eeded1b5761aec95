//! # Parley Core
//!
//! Pure primitives for Parley: identifiers, identifier generation, and time.
//!
//! This crate contains no I/O and no storage. Everything above it refers to
//! users, conversations, and messages only through [`Uuid`] values.
//!
//! ## Key Types
//!
//! - [`Uuid`] - Globally unique, totally ordered entity identifier
//! - [`UuidGenerator`] - Source of candidate identifiers
//! - [`RandomUuidGenerator`] - Server id + clock + random nonce generator
//! - [`Time`] - Creation timestamp in Unix milliseconds
//! - [`Clock`] - Source of the current wall-clock time
//!
//! ## Ordering
//!
//! Identifiers order by creation clock value first, so iterating a store
//! keyed by [`Uuid`] visits entities in (approximately) creation order.

pub mod error;
pub mod generator;
pub mod time;
pub mod types;

pub use error::{CoreError, Result};
pub use generator::{RandomUuidGenerator, UuidGenerator};
pub use time::{Clock, SystemClock, Time};
pub use types::Uuid;
