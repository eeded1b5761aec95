//! # Parley
//!
//! The core of a chat service: users create conversations and exchange
//! ordered messages, with per-conversation access control.
//!
//! ## Overview
//!
//! - **Model**: users, conversation headers and payloads, and messages, each
//!   in an [`OrderedStore`](parley_store::OrderedStore) keyed by [`Uuid`]
//! - **Controller**: the only writer. Allocates identifiers, keeps message
//!   chains linked, and delegates permission changes to descriptors
//! - **View**: read-only queries over the model
//! - **UserContext**: checks a user's permissions before calling the
//!   controller
//! - **Snapshot**: JSON image of the model, replayed on load
//! - **ChatService**: a tokio task owning the controller, reached through a
//!   cloneable [`ChatHandle`]
//!
//! ## Key Concepts
//!
//! - **Chain**: a conversation's messages linked through `next`, from the
//!   payload's `first_message` to its `last_message`. [`Uuid::NIL`] ends it.
//! - **Identifier space**: users, conversations, and messages share one;
//!   a fresh identifier names nothing of any kind.
//! - **Not found is not an error**: controller operations return `None`
//!   when a referenced entity is missing. Only permission checks fail loudly.
//!
//! ## Usage
//!
//! ```rust
//! use parley::{Controller, UserContext};
//! use parley::perms::PermissionFlags;
//!
//! let mut controller = Controller::with_server(1);
//! let ada = controller.new_user("ada");
//! let bob = controller.new_user("bob");
//!
//! let conversation = controller.new_conversation("general", ada.id).unwrap();
//! controller
//!     .set_conversation_explicit_permissions(conversation.id, ada.id, bob.id, PermissionFlags::MEMBER)
//!     .unwrap();
//!
//! let mut as_bob = UserContext::new(&mut controller, bob.id).unwrap();
//! as_bob.add_message(conversation.id, "hello").unwrap();
//! assert!(as_bob.delete_conversation(conversation.id).is_err());
//!
//! let bodies: Vec<_> = controller
//!     .view()
//!     .conversation_messages(&conversation.id)
//!     .map(|m| m.content.clone())
//!     .collect();
//! assert_eq!(bodies, vec!["hello"]);
//! ```
//!
//! ## Re-exports
//!
//! - `parley::core` - Identifiers, generators, and time
//! - `parley::store` - The ordered container
//! - `parley::perms` - Permission flags and security descriptors

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod model;
pub mod service;
pub mod snapshot;
pub mod view;

// Re-export component crates
pub use parley_core as core;
pub use parley_perms as perms;
pub use parley_store as store;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use context::UserContext;
pub use controller::Controller;
pub use error::{ChatError, Result, SnapshotError};
pub use model::{ConversationHeader, ConversationPayload, Message, Model, User};
pub use service::{ChatHandle, ChatService, Command};
pub use snapshot::{PersistenceFile, RestoreReport, ServerInfo, SNAPSHOT_VERSION};
pub use view::{Chain, View};

pub use parley_core::{Time, Uuid};
