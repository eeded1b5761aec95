//! The single-writer service end to end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parley::perms::PermissionFlags;
use parley::{ChatError, ChatService, Controller, Model, PersistenceFile, ServerConfig};
use parley_testkit::{ManualClock, SequenceUuidGenerator};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn controller() -> Controller {
    Controller::new(
        Model::new(),
        Box::new(SequenceUuidGenerator::new(1)),
        Arc::new(ManualClock::at(1_000)),
    )
}

#[tokio::test]
async fn test_conversation_flow_through_handle() -> Result<()> {
    init_tracing();
    let handle = ChatService::spawn(ServerConfig::default(), controller());

    let ada = handle.new_user("ada").await?;
    let bob = handle.new_user("bob").await?;
    let conv = handle.start_conversation(ada.id, "general").await?;

    handle
        .set_permissions(ada.id, conv.id, bob.id, PermissionFlags::MEMBER)
        .await?;
    handle.add_message(ada.id, conv.id, "hi bob").await?;
    let reply = handle.add_message(bob.id, conv.id, "hi ada").await?;

    let bodies: Vec<String> = handle
        .messages(bob.id, conv.id)
        .await?
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(bodies, vec!["hi bob", "hi ada"]);

    let err = handle.delete_message(bob.id, conv.id, reply.id).await.unwrap_err();
    assert!(err.is_security_violation());
    handle.delete_message(ada.id, conv.id, reply.id).await?;

    assert_eq!(handle.conversations(bob.id).await?.len(), 1);
    assert_eq!(handle.users().await?.len(), 2);
    assert_eq!(handle.users_by_name("bob").await?[0].id, bob.id);
    assert_eq!(handle.find_user(ada.id).await?.map(|u| u.name), Some("ada".to_string()));

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() -> Result<()> {
    let handle = ChatService::spawn(ServerConfig::default(), controller());
    let other = handle.clone();
    handle.shutdown().await?;

    let err = other.new_user("late").await.unwrap_err();
    assert!(matches!(err, ChatError::ServiceClosed));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_writes_snapshot_and_open_restores() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = ServerConfig {
        server_id: 1,
        snapshot_path: Some(dir.path().join("state.json")),
        snapshot_interval: Duration::from_secs(3600),
        ..ServerConfig::default()
    };

    let handle = ChatService::spawn(config.clone(), controller());
    let ada = handle.new_user("ada").await?;
    let conv = handle.start_conversation(ada.id, "general").await?;
    handle.add_message(ada.id, conv.id, "persist me").await?;
    handle.shutdown().await?;

    let file = PersistenceFile::read_from(&dir.path().join("state.json"))?;
    assert_eq!(file.messages.len(), 1);

    let reopened = ChatService::open(config).await?;
    let bodies: Vec<String> = reopened
        .messages(ada.id, conv.id)
        .await?
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(bodies, vec!["persist me"]);

    // New identifiers never collide with restored ones.
    let bob = reopened.new_user("bob").await?;
    assert_ne!(bob.id, ada.id);
    reopened.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_periodic_snapshot() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("periodic.json");
    let config = ServerConfig {
        snapshot_path: Some(path.clone()),
        snapshot_interval: Duration::from_millis(20),
        ..ServerConfig::default()
    };

    let handle = ChatService::spawn(config, controller());
    handle.new_user("ada").await?;

    let mut written = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Ok(file) = PersistenceFile::read_from(&path) {
            if file.users.len() == 1 {
                written = true;
                break;
            }
        }
    }
    assert!(written, "no periodic snapshot appeared");
    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_open_rejects_corrupt_snapshot() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json")?;
    let config = ServerConfig {
        snapshot_path: Some(path),
        ..ServerConfig::default()
    };

    let err = ChatService::open(config).await.unwrap_err();
    assert!(matches!(err, ChatError::Snapshot(_)));
    Ok(())
}

#[tokio::test]
async fn test_open_without_file_starts_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ServerConfig {
        snapshot_path: Some(dir.path().join("absent.json")),
        snapshot_interval: Duration::from_secs(3600),
        ..ServerConfig::default()
    };

    let handle = ChatService::open(config).await?;
    assert!(handle.users().await?.is_empty());
    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_snapshot_without_path_is_noop() -> Result<()> {
    let handle = ChatService::spawn(ServerConfig::default(), controller());
    handle.snapshot().await?;
    handle.shutdown().await?;
    Ok(())
}
