//! Read-only queries over the model.

use std::iter::FusedIterator;

use parley_core::Uuid;
use parley_store::StoreAccessor;

use crate::model::{ConversationHeader, ConversationPayload, Message, Model, User};

/// A borrowed, read-only view of every store.
#[derive(Clone, Copy)]
pub struct View<'a> {
    model: &'a Model,
}

impl<'a> View<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    pub fn find_user(&self, id: &Uuid) -> Option<&'a User> {
        self.model.user_by_id().first(id)
    }

    pub fn find_conversation(&self, id: &Uuid) -> Option<&'a ConversationHeader> {
        self.model.conversation_by_id().first(id)
    }

    pub fn find_payload(&self, id: &Uuid) -> Option<&'a ConversationPayload> {
        self.model.payload_by_id().first(id)
    }

    pub fn find_message(&self, id: &Uuid) -> Option<&'a Message> {
        self.model.message_by_id().first(id)
    }

    /// Users ordered by id.
    pub fn users(&self) -> &'a dyn StoreAccessor<Uuid, User> {
        self.model.user_by_id()
    }

    pub fn conversations(&self) -> &'a dyn StoreAccessor<Uuid, ConversationHeader> {
        self.model.conversation_by_id()
    }

    pub fn payloads(&self) -> &'a dyn StoreAccessor<Uuid, ConversationPayload> {
        self.model.payload_by_id()
    }

    pub fn messages(&self) -> &'a dyn StoreAccessor<Uuid, Message> {
        self.model.message_by_id()
    }

    /// Every user registered under `name`, oldest registration first.
    pub fn users_by_name(&self, name: &str) -> impl Iterator<Item = &'a User> + 'a {
        let by_id = self.model.user_by_id();
        self.model
            .user_by_name()
            .at(&name.to_string())
            .filter_map(move |id| by_id.first(id))
    }

    /// The messages of `conversation` in chain order.
    ///
    /// Empty if the conversation does not exist.
    pub fn conversation_messages(&self, conversation: &Uuid) -> Chain<'a> {
        let start = self
            .find_payload(conversation)
            .map(|payload| payload.first_message)
            .unwrap_or(Uuid::NIL);
        Chain {
            messages: self.model.message_by_id(),
            cursor: start,
        }
    }

    /// The messages among `ids` that exist, in the order requested.
    pub fn messages_by_ids(&self, ids: &[Uuid]) -> Vec<&'a Message> {
        ids.iter().filter_map(|id| self.find_message(id)).collect()
    }

    /// The payloads among `ids` that exist, in the order requested.
    pub fn payloads_by_ids(&self, ids: &[Uuid]) -> Vec<&'a ConversationPayload> {
        ids.iter().filter_map(|id| self.find_payload(id)).collect()
    }
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("users", &self.users().len())
            .field("conversations", &self.conversations().len())
            .field("messages", &self.messages().len())
            .finish()
    }
}

/// Walks a message chain through `next` until [`Uuid::NIL`].
#[derive(Clone)]
pub struct Chain<'a> {
    messages: &'a dyn StoreAccessor<Uuid, Message>,
    cursor: Uuid,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Message;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_nil() {
            return None;
        }
        match self.messages.first(&self.cursor) {
            Some(message) => {
                self.cursor = message.next;
                Some(message)
            }
            None => {
                self.cursor = Uuid::NIL;
                None
            }
        }
    }
}

impl FusedIterator for Chain<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Time;

    fn message(n: u64, next: u64) -> Message {
        let id = |n: u64| if n == 0 { Uuid::NIL } else { Uuid::new(n, 0, 0) };
        Message {
            id: id(n),
            next: id(next),
            previous: Uuid::NIL,
            creation: Time::from_ms(n as i64),
            author: Uuid::new(100, 0, 0),
            content: format!("m{n}"),
        }
    }

    #[test]
    fn test_chain_stops_at_nil() {
        let mut model = Model::new();
        model.add_message(message(3, 1));
        model.add_message(message(1, 0));
        model.add_message(message(2, 3));

        let chain = Chain {
            messages: model.message_by_id(),
            cursor: Uuid::new(2, 0, 0),
        };
        let contents: Vec<&str> = chain.map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m1"]);
    }

    #[test]
    fn test_unknown_conversation_has_no_messages() {
        let model = Model::new();
        let view = View::new(&model);
        assert_eq!(view.conversation_messages(&Uuid::new(1, 0, 0)).count(), 0);
    }

    #[test]
    fn test_by_ids_skips_missing() {
        let mut model = Model::new();
        model.add_message(message(1, 0));
        model.add_message(message(2, 0));
        let view = View::new(&model);

        let found = view.messages_by_ids(&[Uuid::new(2, 0, 0), Uuid::new(9, 0, 0), Uuid::new(1, 0, 0)]);
        let ids: Vec<Uuid> = found.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![Uuid::new(2, 0, 0), Uuid::new(1, 0, 0)]);
    }
}
