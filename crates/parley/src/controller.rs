//! The Controller: the single entry point for every state mutation.
//!
//! It allocates identifiers, checks that referenced entities exist before
//! touching anything, keeps message chains linked, and delegates permission
//! changes to each conversation's security descriptor.

use std::sync::Arc;

use parley_core::{Clock, RandomUuidGenerator, SystemClock, Time, Uuid, UuidGenerator};
use parley_perms::{PermissionFlags, SecurityDescriptor};
use parley_store::StoreAccessor;
use tracing::{debug, info};

use crate::error::{ChatError, Result};
use crate::model::{ConversationHeader, Message, Model, User};
use crate::view::View;

/// Owns the model and performs all mutations on it.
pub struct Controller {
    model: Model,
    generator: Box<dyn UuidGenerator>,
    clock: Arc<dyn Clock>,
}

impl Controller {
    /// Create a controller over `model`.
    pub fn new(model: Model, generator: Box<dyn UuidGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            model,
            generator,
            clock,
        }
    }

    /// An empty controller for `server_id`, using the system clock and
    /// random identifiers.
    pub fn with_server(server_id: u32) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let generator = RandomUuidGenerator::new(server_id, clock.clone());
        Self::new(Model::new(), Box::new(generator), clock)
    }

    /// Read-only access to the model.
    pub fn view(&self) -> View<'_> {
        View::new(&self.model)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a user under a fresh identifier.
    pub fn new_user(&mut self, name: &str) -> User {
        let id = self.create_id();
        let creation = self.clock.now();
        self.insert_user(id, name, creation)
    }

    /// Create a conversation owned by `owner`, or `None` if the owner is not
    /// a registered user.
    pub fn new_conversation(&mut self, title: &str, owner: Uuid) -> Option<ConversationHeader> {
        if self.model.user_by_id().first(&owner).is_none() {
            debug!(owner = %owner, "new conversation refused, unknown owner");
            return None;
        }
        let id = self.create_id();
        let creation = self.clock.now();
        self.new_conversation_with_id(id, title, owner, creation)
    }

    /// Append a message to the end of `conversation`.
    ///
    /// `None` if the author or the conversation does not exist.
    pub fn new_message(&mut self, author: Uuid, conversation: Uuid, body: &str) -> Option<Message> {
        let id = self.create_id();
        let creation = self.clock.now();
        self.new_message_with_id(id, author, conversation, body, creation)
    }

    /// Register a user with a caller-supplied identifier.
    ///
    /// `None` if the identifier is already in use.
    pub fn new_user_with_id(&mut self, id: Uuid, name: &str, creation: Time) -> Option<User> {
        if !self.is_id_free(&id) {
            info!(user = %id, name = name, "new user refused, id in use");
            return None;
        }
        Some(self.insert_user(id, name, creation))
    }

    /// Create a conversation with a caller-supplied identifier.
    ///
    /// The owner is given the creator preset.
    pub fn new_conversation_with_id(
        &mut self,
        id: Uuid,
        title: &str,
        owner: Uuid,
        creation: Time,
    ) -> Option<ConversationHeader> {
        if self.model.user_by_id().first(&owner).is_none() || !self.is_id_free(&id) {
            return None;
        }

        let header = ConversationHeader {
            id,
            owner,
            creation,
            title: title.to_string(),
            security: SecurityDescriptor::new(owner),
        };
        self.model.add_conversation(header.clone());
        info!(conversation = %id, owner = %owner, title, "conversation added");
        Some(header)
    }

    /// Append a message with a caller-supplied identifier.
    ///
    /// The new message's `previous` is the conversation's prior last
    /// message.
    pub fn new_message_with_id(
        &mut self,
        id: Uuid,
        author: Uuid,
        conversation: Uuid,
        body: &str,
        creation: Time,
    ) -> Option<Message> {
        if self.model.user_by_id().first(&author).is_none() {
            debug!(author = %author, "new message refused, unknown author");
            return None;
        }
        let last = match self.model.payload_by_id().first(&conversation) {
            Some(payload) => payload.last_message,
            None => {
                debug!(conversation = %conversation, "new message refused, unknown conversation");
                return None;
            }
        };
        if !self.is_id_free(&id) {
            return None;
        }

        let message = Message {
            id,
            next: Uuid::NIL,
            previous: last,
            creation,
            author,
            content: body.to_string(),
        };
        self.model.add_message(message.clone());

        if !last.is_nil() {
            if let Some(tail) = self.model.message_mut(&last) {
                tail.next = id;
            }
        }
        if let Some(payload) = self.model.payload_mut(&conversation) {
            if payload.first_message.is_nil() {
                payload.first_message = id;
            }
            payload.last_message = id;
        }

        info!(message = %id, conversation = %conversation, author = %author, "message added");
        Some(message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deletion
    // ─────────────────────────────────────────────────────────────────────────

    /// Unlink `message` from the chain of `conversation` and remove it.
    ///
    /// `None` if the conversation does not exist or the message is not in
    /// its chain.
    pub fn delete_message(&mut self, conversation: Uuid, message: Uuid) -> Option<Message> {
        let first = self.model.payload_by_id().first(&conversation)?.first_message;
        if first.is_nil() || message.is_nil() {
            return None;
        }

        if first == message {
            let removed = self.model.remove_message(&message)?;
            if let Some(payload) = self.model.payload_mut(&conversation) {
                payload.first_message = removed.next;
                if payload.last_message == message {
                    payload.last_message = Uuid::NIL;
                }
            }
            if let Some(head) = self.model.message_mut(&removed.next) {
                head.previous = Uuid::NIL;
            }
            info!(message = %message, conversation = %conversation, "message deleted");
            return Some(removed);
        }

        // Find the predecessor. NIL ends the chain.
        let mut predecessor = first;
        loop {
            let next = match self.model.message_by_id().first(&predecessor) {
                Some(current) => current.next,
                None => {
                    debug_assert!(false, "dangling chain link {predecessor}");
                    return None;
                }
            };
            if next.is_nil() {
                debug!(message = %message, conversation = %conversation, "message not in chain");
                return None;
            }
            if next == message {
                break;
            }
            predecessor = next;
        }

        let removed = self.model.remove_message(&message)?;
        if let Some(current) = self.model.message_mut(&predecessor) {
            current.next = removed.next;
        }
        if let Some(successor) = self.model.message_mut(&removed.next) {
            successor.previous = predecessor;
        }
        if let Some(payload) = self.model.payload_mut(&conversation) {
            if payload.last_message == message {
                payload.last_message = predecessor;
            }
        }

        info!(message = %message, conversation = %conversation, "message deleted");
        Some(removed)
    }

    /// Remove a conversation, its payload, and every message in its chain.
    ///
    /// Callers are responsible for checking that the requester may do so.
    pub fn delete_conversation(&mut self, id: Uuid) -> Option<ConversationHeader> {
        let header = self.model.remove_conversation(&id)?;
        let mut removed = 0usize;

        if let Some(payload) = self.model.remove_payload(&id) {
            let mut cursor = payload.first_message;
            while !cursor.is_nil() {
                match self.model.remove_message(&cursor) {
                    Some(message) => {
                        cursor = message.next;
                        removed += 1;
                    }
                    None => {
                        debug_assert!(false, "dangling chain link {cursor}");
                        break;
                    }
                }
            }
        }

        info!(conversation = %id, messages = removed, "conversation deleted");
        Some(header)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Security
    // ─────────────────────────────────────────────────────────────────────────

    /// Give `target` an explicit permission entry in `conversation`.
    pub fn set_conversation_explicit_permissions(
        &mut self,
        conversation: Uuid,
        invoker: Uuid,
        target: Uuid,
        flags: PermissionFlags,
    ) -> Result<()> {
        let header = self
            .model
            .conversation_mut(&conversation)
            .ok_or_else(|| ChatError::conversation_not_found(conversation))?;
        header.security.set_permissions(&invoker, &target, flags)?;

        info!(
            conversation = %conversation,
            invoker = %invoker,
            target = %target,
            flags = %flags,
            "permissions set"
        );
        Ok(())
    }

    /// Drop `target`'s explicit entry in `conversation`.
    pub fn reset_conversation_explicit_permissions(
        &mut self,
        conversation: Uuid,
        invoker: Uuid,
        target: Uuid,
    ) -> Result<()> {
        let header = self
            .model
            .conversation_mut(&conversation)
            .ok_or_else(|| ChatError::conversation_not_found(conversation))?;
        header.security.reset_permissions(&invoker, &target)?;

        info!(
            conversation = %conversation,
            invoker = %invoker,
            target = %target,
            "permissions reset"
        );
        Ok(())
    }

    /// Replace a conversation's descriptor with a persisted one.
    pub fn restore_security(&mut self, conversation: Uuid, security: SecurityDescriptor) -> Result<()> {
        let header = self
            .model
            .conversation_mut(&conversation)
            .ok_or_else(|| ChatError::conversation_not_found(conversation))?;
        header.security = security;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    fn insert_user(&mut self, id: Uuid, name: &str, creation: Time) -> User {
        let user = User {
            id,
            name: name.to_string(),
            creation,
        };
        self.model.add_user(user.clone());
        info!(user = %id, name = name, "user added");
        user
    }

    /// First generated candidate that names no existing entity.
    fn create_id(&mut self) -> Uuid {
        let mut candidate = self.generator.make();
        while self.model.is_id_in_use(&candidate) {
            debug!(candidate = %candidate, "generated id in use, retrying");
            candidate = self.generator.make();
        }
        candidate
    }

    fn is_id_free(&self, id: &Uuid) -> bool {
        !id.is_nil() && !self.model.is_id_in_use(id)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
