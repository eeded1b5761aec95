//! The security boundary in front of the controller.
//!
//! A [`UserContext`] acts on behalf of one registered user and checks that
//! user's effective permissions in a conversation before any mutation.

use parley_core::Uuid;
use parley_perms::{PermissionFlags, PermsError};
use tracing::warn;

use crate::controller::Controller;
use crate::error::{ChatError, Result};
use crate::model::{ConversationHeader, Message, User};

/// Operations performed as a specific user.
#[derive(Debug)]
pub struct UserContext<'a> {
    user: User,
    controller: &'a mut Controller,
}

impl<'a> UserContext<'a> {
    /// Act as `user`. Fails if the user is not registered.
    pub fn new(controller: &'a mut Controller, user: Uuid) -> Result<Self> {
        let user = controller
            .view()
            .find_user(&user)
            .cloned()
            .ok_or_else(|| ChatError::user_not_found(user))?;
        Ok(Self { user, controller })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Start a conversation owned by this user.
    pub fn start_conversation(&mut self, title: &str) -> Result<ConversationHeader> {
        self.controller
            .new_conversation(title, self.user.id)
            .ok_or_else(|| ChatError::user_not_found(self.user.id))
    }

    /// Conversations this user may read.
    pub fn conversations(&self) -> Vec<ConversationHeader> {
        let id = self.user.id;
        self.controller
            .view()
            .conversations()
            .all()
            .filter(|header| header.security.has_flags(&id, PermissionFlags::VIEW_MESSAGES))
            .cloned()
            .collect()
    }

    /// Append a message. Requires add-messages.
    pub fn add_message(&mut self, conversation: Uuid, body: &str) -> Result<Message> {
        self.require(conversation, PermissionFlags::ADD_MESSAGES)?;
        self.controller
            .new_message(self.user.id, conversation, body)
            .ok_or_else(|| ChatError::conversation_not_found(conversation))
    }

    /// Delete a message. Requires delete-messages.
    pub fn delete_message(&mut self, conversation: Uuid, message: Uuid) -> Result<Message> {
        self.require(conversation, PermissionFlags::DELETE_MESSAGES)?;
        self.controller
            .delete_message(conversation, message)
            .ok_or_else(|| ChatError::message_not_found(message))
    }

    /// Delete a conversation. Allowed for the owner and for holders of
    /// modify-security.
    pub fn delete_conversation(&mut self, conversation: Uuid) -> Result<ConversationHeader> {
        let header = self.header(conversation)?;
        let allowed = header.owner == self.user.id
            || header
                .security
                .has_flags(&self.user.id, PermissionFlags::MODIFY_SECURITY);
        if !allowed {
            return Err(self.reject(conversation, PermissionFlags::MODIFY_SECURITY));
        }
        self.controller
            .delete_conversation(conversation)
            .ok_or_else(|| ChatError::conversation_not_found(conversation))
    }

    /// The conversation's messages in chain order. Requires view-messages.
    pub fn messages(&self, conversation: Uuid) -> Result<Vec<Message>> {
        self.require(conversation, PermissionFlags::VIEW_MESSAGES)?;
        Ok(self
            .controller
            .view()
            .conversation_messages(&conversation)
            .cloned()
            .collect())
    }

    /// Explicit permission entries. Requires read-security.
    pub fn security_entries(&self, conversation: Uuid) -> Result<Vec<(Uuid, PermissionFlags)>> {
        self.require(conversation, PermissionFlags::READ_SECURITY)?;
        let header = self.header(conversation)?;
        Ok(header.security.explicit_entries().collect())
    }

    /// Give `target` an explicit entry of `flags`.
    pub fn set_permissions(
        &mut self,
        conversation: Uuid,
        target: Uuid,
        flags: PermissionFlags,
    ) -> Result<()> {
        let result = self.controller.set_conversation_explicit_permissions(
            conversation,
            self.user.id,
            target,
            flags,
        );
        self.log_violation(&result);
        result
    }

    /// Revert `target` to the conversation's baseline.
    pub fn reset_permissions(&mut self, conversation: Uuid, target: Uuid) -> Result<()> {
        let result =
            self.controller
                .reset_conversation_explicit_permissions(conversation, self.user.id, target);
        self.log_violation(&result);
        result
    }

    fn header(&self, conversation: Uuid) -> Result<&ConversationHeader> {
        self.controller
            .view()
            .find_conversation(&conversation)
            .ok_or_else(|| ChatError::conversation_not_found(conversation))
    }

    fn require(&self, conversation: Uuid, required: PermissionFlags) -> Result<()> {
        let header = self.header(conversation)?;
        if header.security.has_flags(&self.user.id, required) {
            Ok(())
        } else {
            Err(self.reject(conversation, required))
        }
    }

    fn reject(&self, conversation: Uuid, required: PermissionFlags) -> ChatError {
        warn!(
            user = %self.user.id,
            conversation = %conversation,
            required = %required,
            "security violation"
        );
        ChatError::Security(PermsError::MissingPermissions {
            user: self.user.id,
            conversation,
            required,
        })
    }

    fn log_violation(&self, result: &Result<()>) {
        if let Err(ChatError::Security(err)) = result {
            warn!(user = %self.user.id, error = %err, "security violation");
        }
    }
}
