//! Identifier generation.
//!
//! A generator only proposes candidates. Uniqueness across users,
//! conversations, and messages is checked by the controller, which asks for
//! another candidate when one is already taken.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::time::Clock;
use crate::types::Uuid;

/// Source of candidate identifiers.
pub trait UuidGenerator: Send {
    /// Produce a candidate. Never returns [`Uuid::NIL`].
    fn make(&mut self) -> Uuid;
}

/// Combines the server identity, the current clock value, and a random
/// nonce.
pub struct RandomUuidGenerator {
    server: u32,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl RandomUuidGenerator {
    pub fn new(server: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            server,
            clock,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic nonces, for reproducible tests.
    pub fn with_seed(server: u32, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            server,
            clock,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn server(&self) -> u32 {
        self.server
    }
}

impl UuidGenerator for RandomUuidGenerator {
    fn make(&mut self) -> Uuid {
        let time = self.clock.now().in_ms().max(0) as u64;
        // A zero nonce could reproduce NIL at time zero.
        let nonce = self.rng.gen_range(1..=u32::MAX);
        Uuid::new(time, self.server, nonce)
    }
}

impl std::fmt::Debug for RandomUuidGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomUuidGenerator")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}
