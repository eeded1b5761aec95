//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic identifiers, a
//! clock tests can move by hand, and a controller pre-wired with both.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parley::{Controller, ConversationHeader, Message, Model, User};
use parley_core::{Clock, Time, Uuid, UuidGenerator};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(ms: i64) -> Self {
        Self {
            ms: Arc::new(AtomicI64::new(ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        Time::from_ms(self.ms.load(Ordering::SeqCst))
    }
}

/// Hands out `Uuid::new(1, server, 0)`, `Uuid::new(2, server, 0)`, ...
///
/// Identifiers therefore sort in the order they were made.
#[derive(Debug, Clone)]
pub struct SequenceUuidGenerator {
    server: u32,
    next: u64,
}

impl SequenceUuidGenerator {
    pub fn new(server: u32) -> Self {
        Self { server, next: 1 }
    }

    /// The identifier the next call to `make` returns.
    pub fn peek(&self) -> Uuid {
        Uuid::new(self.next, self.server, 0)
    }
}

impl UuidGenerator for SequenceUuidGenerator {
    fn make(&mut self) -> Uuid {
        let id = self.peek();
        self.next += 1;
        id
    }
}

/// Replays a fixed list of identifiers, then falls back to a sequence.
///
/// Used to force collisions.
#[derive(Debug, Clone)]
pub struct ScriptedUuidGenerator {
    script: VecDeque<Uuid>,
    fallback: SequenceUuidGenerator,
}

impl ScriptedUuidGenerator {
    pub fn new(script: impl IntoIterator<Item = Uuid>, fallback: SequenceUuidGenerator) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
        }
    }
}

impl UuidGenerator for ScriptedUuidGenerator {
    fn make(&mut self) -> Uuid {
        match self.script.pop_front() {
            Some(id) => id,
            None => self.fallback.make(),
        }
    }
}

/// A controller with sequential identifiers and a manual clock at 1000 ms.
pub struct ChatFixture {
    pub controller: Controller,
    pub clock: ManualClock,
}

impl ChatFixture {
    pub fn new() -> Self {
        Self::with_generator(Box::new(SequenceUuidGenerator::new(1)))
    }

    pub fn with_generator(generator: Box<dyn UuidGenerator>) -> Self {
        let clock = ManualClock::at(1_000);
        let controller = Controller::new(Model::new(), generator, Arc::new(clock.clone()));
        Self { controller, clock }
    }

    /// Register a user.
    pub fn user(&mut self, name: &str) -> User {
        self.controller.new_user(name)
    }

    /// Create a conversation owned by `owner`.
    pub fn conversation(&mut self, owner: &User, title: &str) -> ConversationHeader {
        self.controller
            .new_conversation(title, owner.id)
            .expect("fixture owner exists")
    }

    /// Post each body in order, advancing the clock 1 ms per message.
    pub fn post(&mut self, author: &User, conversation: &ConversationHeader, bodies: &[&str]) -> Vec<Message> {
        bodies
            .iter()
            .map(|body| {
                self.clock.advance(1);
                self.controller
                    .new_message(author.id, conversation.id, body)
                    .expect("fixture author and conversation exist")
            })
            .collect()
    }

    /// Message ids in chain order.
    pub fn chain(&self, conversation: Uuid) -> Vec<Uuid> {
        self.controller
            .view()
            .conversation_messages(&conversation)
            .map(|m| m.id)
            .collect()
    }

    /// Panic unless the chain of `conversation` is fully consistent: ends
    /// match the payload, `previous` mirrors `next`, and every message of
    /// the chain is visited exactly once.
    pub fn assert_chain_consistent(&self, conversation: Uuid) {
        let view = self.controller.view();
        let payload = view.find_payload(&conversation).expect("payload exists");
        let chain: Vec<&Message> = view.conversation_messages(&conversation).collect();

        assert_eq!(
            payload.first_message.is_nil(),
            payload.last_message.is_nil(),
            "first and last must be NIL together"
        );
        match (chain.first(), chain.last()) {
            (Some(first), Some(last)) => {
                assert_eq!(first.id, payload.first_message);
                assert_eq!(last.id, payload.last_message);
                assert_eq!(last.next, Uuid::NIL);
            }
            _ => assert!(payload.is_empty()),
        }

        let mut previous = Uuid::NIL;
        for message in &chain {
            assert_eq!(message.previous, previous, "previous of {}", message.id);
            previous = message.id;
        }
    }
}

impl Default for ChatFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `0..n` in a deterministic shuffled order.
pub fn shuffled_keys(n: u64, seed: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_orders_by_creation() {
        let mut generator = SequenceUuidGenerator::new(4);
        let a = generator.make();
        let b = generator.make();
        assert!(a < b);
        assert_eq!(a.server(), 4);
        assert!(!a.is_nil());
    }

    #[test]
    fn test_scripted_then_fallback() {
        let scripted = Uuid::new(42, 0, 0);
        let mut generator = ScriptedUuidGenerator::new([scripted], SequenceUuidGenerator::new(0));
        assert_eq!(generator.make(), scripted);
        assert_eq!(generator.make(), Uuid::new(1, 0, 0));
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::at(5);
        let other = clock.clone();
        other.advance(10);
        assert_eq!(clock.now(), Time::from_ms(15));
    }

    #[test]
    fn test_fixture_chain_consistent() {
        let mut fixture = ChatFixture::new();
        let ada = fixture.user("ada");
        let conv = fixture.conversation(&ada, "general");
        fixture.assert_chain_consistent(conv.id);
        let posted = fixture.post(&ada, &conv, &["a", "b", "c"]);
        assert_eq!(fixture.chain(conv.id), posted.iter().map(|m| m.id).collect::<Vec<_>>());
        fixture.assert_chain_consistent(conv.id);
    }

    #[test]
    fn test_shuffled_keys_is_permutation() {
        let mut keys = shuffled_keys(100, 3);
        assert_eq!(keys, shuffled_keys(100, 3));
        keys.sort_unstable();
        assert_eq!(keys, (0..100).collect::<Vec<_>>());
    }
}
