//! Entities and the stores that hold them.
//!
//! Entities refer to each other only by [`Uuid`]. A conversation is split
//! in two: the header (title, owner, security) and the payload (the ends of
//! its message chain). Messages are linked into a singly walked chain
//! through `next`, with `previous` kept as the back pointer.

use parley_core::{Time, Uuid};
use parley_perms::SecurityDescriptor;
use parley_store::{OrderedStore, StoreAccessor};
use serde::{Deserialize, Serialize};

/// A registered user. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub creation: Time,
}

/// Conversation metadata and its access control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHeader {
    pub id: Uuid,
    pub owner: Uuid,
    pub creation: Time,
    pub title: String,
    pub security: SecurityDescriptor,
}

/// The ends of a conversation's message chain.
///
/// Shares its id with the header. Both ends are [`Uuid::NIL`] when the
/// conversation is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub id: Uuid,
    pub first_message: Uuid,
    pub last_message: Uuid,
}

impl ConversationPayload {
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            first_message: Uuid::NIL,
            last_message: Uuid::NIL,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_message.is_nil()
    }
}

/// One message in a conversation chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub next: Uuid,
    pub previous: Uuid,
    pub creation: Time,
    pub author: Uuid,
    pub content: String,
}

/// Every entity store.
///
/// Mutation is crate-private; outside the crate the model is reached
/// through [`crate::Controller`] and read through [`crate::View`].
#[derive(Debug, Default)]
pub struct Model {
    user_by_id: OrderedStore<Uuid, User>,
    user_by_name: OrderedStore<String, Uuid>,
    conversation_by_id: OrderedStore<Uuid, ConversationHeader>,
    payload_by_id: OrderedStore<Uuid, ConversationPayload>,
    message_by_id: OrderedStore<Uuid, Message>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────────

    pub fn user_by_id(&self) -> &dyn StoreAccessor<Uuid, User> {
        &self.user_by_id
    }

    pub fn user_by_name(&self) -> &dyn StoreAccessor<String, Uuid> {
        &self.user_by_name
    }

    pub fn conversation_by_id(&self) -> &dyn StoreAccessor<Uuid, ConversationHeader> {
        &self.conversation_by_id
    }

    pub fn payload_by_id(&self) -> &dyn StoreAccessor<Uuid, ConversationPayload> {
        &self.payload_by_id
    }

    pub fn message_by_id(&self) -> &dyn StoreAccessor<Uuid, Message> {
        &self.message_by_id
    }

    /// Whether `id` names a user, conversation, or message.
    pub fn is_id_in_use(&self, id: &Uuid) -> bool {
        self.message_by_id.contains(id)
            || self.conversation_by_id.contains(id)
            || self.user_by_id.contains(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn add_user(&mut self, user: User) {
        self.user_by_name.insert(user.name.clone(), user.id);
        self.user_by_id.insert(user.id, user);
    }

    /// Insert a header together with its empty payload.
    pub(crate) fn add_conversation(&mut self, header: ConversationHeader) {
        self.payload_by_id.insert(header.id, ConversationPayload::empty(header.id));
        self.conversation_by_id.insert(header.id, header);
    }

    pub(crate) fn add_message(&mut self, message: Message) {
        self.message_by_id.insert(message.id, message);
    }

    pub(crate) fn conversation_mut(&mut self, id: &Uuid) -> Option<&mut ConversationHeader> {
        self.conversation_by_id.first_mut(id)
    }

    pub(crate) fn payload_mut(&mut self, id: &Uuid) -> Option<&mut ConversationPayload> {
        self.payload_by_id.first_mut(id)
    }

    pub(crate) fn message_mut(&mut self, id: &Uuid) -> Option<&mut Message> {
        self.message_by_id.first_mut(id)
    }

    pub(crate) fn remove_conversation(&mut self, id: &Uuid) -> Option<ConversationHeader> {
        self.conversation_by_id.remove(id)
    }

    pub(crate) fn remove_payload(&mut self, id: &Uuid) -> Option<ConversationPayload> {
        self.payload_by_id.remove(id)
    }

    pub(crate) fn remove_message(&mut self, id: &Uuid) -> Option<Message> {
        self.message_by_id.remove(id)
    }
}
