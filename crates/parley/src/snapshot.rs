//! Full-state snapshots.
//!
//! A snapshot is a JSON image of every store. Loading replays it into a
//! fresh controller through the raw creation operations, so identifiers and
//! creation times come back exactly and message chains are rebuilt link by
//! link.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parley_core::Uuid;
use parley_perms::PermissionFlags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::error::SnapshotError;
use crate::model::{ConversationHeader, ConversationPayload, Message, User};
use crate::view::View;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

type Result<T> = std::result::Result<T, SnapshotError>;

/// Identity of the server that wrote a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: u32,
    pub version: u32,
}

impl ServerInfo {
    pub fn new(server_id: u32) -> Self {
        Self {
            server_id,
            version: SNAPSHOT_VERSION,
        }
    }
}

/// The persisted image of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceFile {
    pub server_info: ServerInfo,
    pub users: BTreeMap<Uuid, User>,
    pub conversation_headers: BTreeMap<Uuid, ConversationHeader>,
    pub conversation_payloads: BTreeMap<Uuid, ConversationPayload>,
    pub messages: BTreeMap<Uuid, Message>,
}

/// What a restore put back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub users: usize,
    pub conversations: usize,
    pub messages: usize,
    /// Messages not reachable from any conversation chain.
    pub skipped_messages: usize,
}

impl PersistenceFile {
    /// Copy every store out of `view`.
    pub fn capture(view: &View<'_>, server_info: ServerInfo) -> Self {
        Self {
            server_info,
            users: view.users().all().map(|u| (u.id, u.clone())).collect(),
            conversation_headers: view
                .conversations()
                .all()
                .map(|c| (c.id, c.clone()))
                .collect(),
            conversation_payloads: view.payloads().all().map(|p| (p.id, p.clone())).collect(),
            messages: view.messages().all().map(|m| (m.id, m.clone())).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to `path` through a sibling temporary file, so a crash never
    /// leaves a truncated snapshot behind.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, json).map_err(|e| SnapshotError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| SnapshotError::io(path, e))?;
        debug!(
            path = %path.display(),
            users = self.users.len(),
            conversations = self.conversation_headers.len(),
            messages = self.messages.len(),
            "snapshot written"
        );
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Replay the snapshot into `controller`, which should be empty.
    ///
    /// Users go in first, then conversations with their descriptors, then
    /// each conversation's messages in chain order. A descriptor that does
    /// not hold the owner as creator, or a payload whose recorded tail
    /// differs from where its chain ends, is `Inconsistent`.
    pub fn restore(self, controller: &mut Controller) -> Result<RestoreReport> {
        let mut report = RestoreReport::default();

        for user in self.users.values() {
            controller
                .new_user_with_id(user.id, &user.name, user.creation)
                .ok_or_else(|| inconsistent(format!("user {} already exists", user.id)))?;
            report.users += 1;
        }

        for header in self.conversation_headers.values() {
            controller
                .new_conversation_with_id(header.id, &header.title, header.owner, header.creation)
                .ok_or_else(|| {
                    inconsistent(format!(
                        "conversation {} has unknown owner {} or a used id",
                        header.id, header.owner
                    ))
                })?;
            if header.security.explicit_permissions(&header.owner) != Some(PermissionFlags::CREATOR) {
                return Err(inconsistent(format!(
                    "conversation {} does not hold owner {} as creator",
                    header.id, header.owner
                )));
            }
            controller
                .restore_security(header.id, header.security.clone())
                .map_err(|e| inconsistent(e.to_string()))?;
            report.conversations += 1;

            let Some(payload) = self.conversation_payloads.get(&header.id) else {
                warn!(conversation = %header.id, "snapshot has no payload, restoring empty");
                continue;
            };
            let (count, tail) = self.replay_chain(controller, header.id, payload.first_message)?;
            if tail != payload.last_message {
                return Err(inconsistent(format!(
                    "conversation {} records last message {} but its chain ends at {}",
                    header.id, payload.last_message, tail
                )));
            }
            report.messages += count;
        }

        report.skipped_messages = self.messages.len().saturating_sub(report.messages);
        if report.skipped_messages > 0 {
            warn!(
                skipped = report.skipped_messages,
                "snapshot messages not reachable from any conversation"
            );
        }

        info!(
            users = report.users,
            conversations = report.conversations,
            messages = report.messages,
            "snapshot restored"
        );
        Ok(report)
    }

    /// Replay one chain; returns the message count and the tail reached.
    fn replay_chain(
        &self,
        controller: &mut Controller,
        conversation: Uuid,
        first: Uuid,
    ) -> Result<(usize, Uuid)> {
        let mut seen = BTreeSet::new();
        let mut tail = Uuid::NIL;
        let mut cursor = first;
        while !cursor.is_nil() {
            if !seen.insert(cursor) {
                return Err(inconsistent(format!(
                    "message chain of {conversation} loops at {cursor}"
                )));
            }
            let message = self.messages.get(&cursor).ok_or_else(|| {
                inconsistent(format!("conversation {conversation} links to missing message {cursor}"))
            })?;
            controller
                .new_message_with_id(message.id, message.author, conversation, &message.content, message.creation)
                .ok_or_else(|| {
                    inconsistent(format!(
                        "message {} has unknown author {} or a used id",
                        message.id, message.author
                    ))
                })?;
            tail = cursor;
            cursor = message.next;
        }
        Ok((seen.len(), tail))
    }
}

fn inconsistent(reason: String) -> SnapshotError {
    SnapshotError::Inconsistent(reason)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
