//! The single-writer chat service.
//!
//! One tokio task owns the [`Controller`]. Every operation, reads included,
//! is sent to it as a [`Command`] over an mpsc queue and answered on a
//! oneshot channel, so operations never interleave. When a snapshot path is
//! configured the task also writes a snapshot periodically and once more on
//! shutdown.

use std::path::PathBuf;

use parley_core::Uuid;
use parley_perms::PermissionFlags;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::context::UserContext;
use crate::controller::Controller;
use crate::error::{ChatError, Result, SnapshotError};
use crate::model::{ConversationHeader, Message, User};
use crate::snapshot::{PersistenceFile, ServerInfo};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests handled by the service task.
#[derive(Debug)]
pub enum Command {
    NewUser {
        name: String,
        reply: oneshot::Sender<User>,
    },
    StartConversation {
        user: Uuid,
        title: String,
        reply: Reply<ConversationHeader>,
    },
    AddMessage {
        user: Uuid,
        conversation: Uuid,
        body: String,
        reply: Reply<Message>,
    },
    DeleteMessage {
        user: Uuid,
        conversation: Uuid,
        message: Uuid,
        reply: Reply<Message>,
    },
    DeleteConversation {
        user: Uuid,
        conversation: Uuid,
        reply: Reply<ConversationHeader>,
    },
    SetPermissions {
        user: Uuid,
        conversation: Uuid,
        target: Uuid,
        flags: PermissionFlags,
        reply: Reply<()>,
    },
    ResetPermissions {
        user: Uuid,
        conversation: Uuid,
        target: Uuid,
        reply: Reply<()>,
    },
    Messages {
        user: Uuid,
        conversation: Uuid,
        reply: Reply<Vec<Message>>,
    },
    SecurityEntries {
        user: Uuid,
        conversation: Uuid,
        reply: Reply<Vec<(Uuid, PermissionFlags)>>,
    },
    Conversations {
        user: Uuid,
        reply: Reply<Vec<ConversationHeader>>,
    },
    FindUser {
        id: Uuid,
        reply: oneshot::Sender<Option<User>>,
    },
    UsersByName {
        name: String,
        reply: oneshot::Sender<Vec<User>>,
    },
    Users {
        reply: oneshot::Sender<Vec<User>>,
    },
    Snapshot {
        reply: Reply<()>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Entry points for starting the service.
pub struct ChatService;

impl ChatService {
    /// Start the service task around `controller`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: ServerConfig, controller: Controller) -> ChatHandle {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        tokio::spawn(run(config, controller, rx));
        ChatHandle { tx }
    }

    /// Start the service, first restoring the configured snapshot if the
    /// file exists. Reading and replaying run on the blocking pool.
    pub async fn open(config: ServerConfig) -> Result<ChatHandle> {
        let restore_config = config.clone();
        let controller = tokio::task::spawn_blocking(move || restore(&restore_config))
            .await
            .map_err(|_| ChatError::ServiceClosed)??;
        Ok(Self::spawn(config, controller))
    }
}

/// Build a controller for `config`, replaying its snapshot when present.
fn restore(config: &ServerConfig) -> Result<Controller> {
    let mut controller = Controller::with_server(config.server_id);
    let Some(path) = config.snapshot_path.as_deref() else {
        return Ok(controller);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot to restore");
        return Ok(controller);
    }

    let file = PersistenceFile::read_from(path)?;
    if file.server_info.server_id != config.server_id {
        warn!(
            snapshot = file.server_info.server_id,
            configured = config.server_id,
            "snapshot written by a different server id"
        );
    }
    let report = file.restore(&mut controller)?;
    info!(path = %path.display(), ?report, "restored snapshot");
    Ok(controller)
}

/// Cloneable handle to a running service.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    tx: mpsc::Sender<Command>,
}

impl ChatHandle {
    pub async fn new_user(&self, name: &str) -> Result<User> {
        let name = name.to_string();
        self.request(|reply| Command::NewUser { name, reply }).await
    }

    pub async fn start_conversation(&self, user: Uuid, title: &str) -> Result<ConversationHeader> {
        let title = title.to_string();
        self.request(|reply| Command::StartConversation { user, title, reply })
            .await?
    }

    pub async fn add_message(&self, user: Uuid, conversation: Uuid, body: &str) -> Result<Message> {
        let body = body.to_string();
        self.request(|reply| Command::AddMessage {
            user,
            conversation,
            body,
            reply,
        })
        .await?
    }

    pub async fn delete_message(&self, user: Uuid, conversation: Uuid, message: Uuid) -> Result<Message> {
        self.request(|reply| Command::DeleteMessage {
            user,
            conversation,
            message,
            reply,
        })
        .await?
    }

    pub async fn delete_conversation(&self, user: Uuid, conversation: Uuid) -> Result<ConversationHeader> {
        self.request(|reply| Command::DeleteConversation {
            user,
            conversation,
            reply,
        })
        .await?
    }

    pub async fn set_permissions(
        &self,
        user: Uuid,
        conversation: Uuid,
        target: Uuid,
        flags: PermissionFlags,
    ) -> Result<()> {
        self.request(|reply| Command::SetPermissions {
            user,
            conversation,
            target,
            flags,
            reply,
        })
        .await?
    }

    pub async fn reset_permissions(&self, user: Uuid, conversation: Uuid, target: Uuid) -> Result<()> {
        self.request(|reply| Command::ResetPermissions {
            user,
            conversation,
            target,
            reply,
        })
        .await?
    }

    pub async fn messages(&self, user: Uuid, conversation: Uuid) -> Result<Vec<Message>> {
        self.request(|reply| Command::Messages {
            user,
            conversation,
            reply,
        })
        .await?
    }

    pub async fn security_entries(
        &self,
        user: Uuid,
        conversation: Uuid,
    ) -> Result<Vec<(Uuid, PermissionFlags)>> {
        self.request(|reply| Command::SecurityEntries {
            user,
            conversation,
            reply,
        })
        .await?
    }

    pub async fn conversations(&self, user: Uuid) -> Result<Vec<ConversationHeader>> {
        self.request(|reply| Command::Conversations { user, reply })
            .await?
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.request(|reply| Command::FindUser { id, reply }).await
    }

    pub async fn users_by_name(&self, name: &str) -> Result<Vec<User>> {
        let name = name.to_string();
        self.request(|reply| Command::UsersByName { name, reply })
            .await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.request(|reply| Command::Users { reply }).await
    }

    /// Write a snapshot now. A no-op without a snapshot path.
    pub async fn snapshot(&self) -> Result<()> {
        self.request(|reply| Command::Snapshot { reply }).await?
    }

    /// Write a final snapshot and stop the service task.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await?
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| ChatError::ServiceClosed)?;
        rx.await.map_err(|_| ChatError::ServiceClosed)
    }
}

async fn run(config: ServerConfig, mut controller: Controller, mut rx: mpsc::Receiver<Command>) {
    let mut ticker = config.snapshot_path.as_ref().map(|_| {
        let period = config.snapshot_interval.max(std::time::Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    info!(server_id = config.server_id, "chat service started");
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Shutdown { reply }) => {
                    let job = capture(&config, &controller);
                    let _ = reply.send(write_snapshot(job).await);
                    break;
                }
                Some(command) => handle(&config, &mut controller, command).await,
                None => {
                    let job = capture(&config, &controller);
                    if let Err(e) = write_snapshot(job).await {
                        warn!(error = %e, "final snapshot failed");
                    }
                    break;
                }
            },
            _ = tick(&mut ticker) => {
                let job = capture(&config, &controller);
                if let Err(e) = write_snapshot(job).await {
                    warn!(error = %e, "periodic snapshot failed");
                }
            }
        }
    }
    info!(server_id = config.server_id, "chat service stopped");
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn handle(config: &ServerConfig, controller: &mut Controller, command: Command) {
    // A dropped reply receiver means the caller gave up; nothing to do.
    match command {
        Command::NewUser { name, reply } => {
            let _ = reply.send(controller.new_user(&name));
        }
        Command::StartConversation { user, title, reply } => {
            let result = UserContext::new(controller, user).and_then(|mut ctx| ctx.start_conversation(&title));
            let _ = reply.send(result);
        }
        Command::AddMessage {
            user,
            conversation,
            body,
            reply,
        } => {
            let result =
                UserContext::new(controller, user).and_then(|mut ctx| ctx.add_message(conversation, &body));
            let _ = reply.send(result);
        }
        Command::DeleteMessage {
            user,
            conversation,
            message,
            reply,
        } => {
            let result = UserContext::new(controller, user)
                .and_then(|mut ctx| ctx.delete_message(conversation, message));
            let _ = reply.send(result);
        }
        Command::DeleteConversation {
            user,
            conversation,
            reply,
        } => {
            let result = UserContext::new(controller, user)
                .and_then(|mut ctx| ctx.delete_conversation(conversation));
            let _ = reply.send(result);
        }
        Command::SetPermissions {
            user,
            conversation,
            target,
            flags,
            reply,
        } => {
            let result = UserContext::new(controller, user)
                .and_then(|mut ctx| ctx.set_permissions(conversation, target, flags));
            let _ = reply.send(result);
        }
        Command::ResetPermissions {
            user,
            conversation,
            target,
            reply,
        } => {
            let result = UserContext::new(controller, user)
                .and_then(|mut ctx| ctx.reset_permissions(conversation, target));
            let _ = reply.send(result);
        }
        Command::Messages {
            user,
            conversation,
            reply,
        } => {
            let result = UserContext::new(controller, user).and_then(|ctx| ctx.messages(conversation));
            let _ = reply.send(result);
        }
        Command::SecurityEntries {
            user,
            conversation,
            reply,
        } => {
            let result =
                UserContext::new(controller, user).and_then(|ctx| ctx.security_entries(conversation));
            let _ = reply.send(result);
        }
        Command::Conversations { user, reply } => {
            let result = UserContext::new(controller, user).map(|ctx| ctx.conversations());
            let _ = reply.send(result);
        }
        Command::FindUser { id, reply } => {
            let _ = reply.send(controller.view().find_user(&id).cloned());
        }
        Command::UsersByName { name, reply } => {
            let _ = reply.send(controller.view().users_by_name(&name).cloned().collect());
        }
        Command::Users { reply } => {
            let _ = reply.send(controller.view().users().all().cloned().collect());
        }
        Command::Snapshot { reply } => {
            let job = capture(config, controller);
            let _ = reply.send(write_snapshot(job).await);
        }
        Command::Shutdown { reply } => {
            // Handled by the run loop.
            let _ = reply.send(Ok(()));
        }
    }
}

/// A snapshot of the current state, if snapshots are configured.
///
/// Captured synchronously so the controller is never borrowed across an
/// await point.
fn capture(config: &ServerConfig, controller: &Controller) -> Option<(PersistenceFile, PathBuf)> {
    let path = config.snapshot_path.clone()?;
    let file = PersistenceFile::capture(&controller.view(), ServerInfo::new(config.server_id));
    Some((file, path))
}

/// Write a captured snapshot on the blocking pool.
async fn write_snapshot(job: Option<(PersistenceFile, PathBuf)>) -> Result<()> {
    let Some((file, path)) = job else {
        return Ok(());
    };
    let target = path.clone();
    tokio::task::spawn_blocking(move || file.write_to(&target))
        .await
        .map_err(|e| SnapshotError::io(path, std::io::Error::new(std::io::ErrorKind::Other, e)))??;
    Ok(())
}
