//! Server configuration loaded from environment variables.
//!
//! Every setting has a default, so a server starts with no configuration at
//! all (and without snapshots).

use std::path::PathBuf;
use std::time::Duration;

/// Chat service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Identity embedded in every generated identifier.
    /// Env: `PARLEY_SERVER_ID`
    /// Default: `0`
    pub server_id: u32,

    /// Where snapshots are written and restored from. `None` disables them.
    /// Env: `PARLEY_SNAPSHOT_PATH`
    pub snapshot_path: Option<PathBuf>,

    /// Time between periodic snapshots.
    /// Env: `PARLEY_SNAPSHOT_INTERVAL_MS`
    /// Default: 30 s
    pub snapshot_interval: Duration,

    /// Capacity of the service command queue.
    /// Env: `PARLEY_COMMAND_BUFFER`
    /// Default: `64`
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_id: 0,
            snapshot_path: None,
            snapshot_interval: Duration::from_secs(30),
            command_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("PARLEY_SERVER_ID") {
            match value.parse::<u32>() {
                Ok(id) => config.server_id = id,
                Err(_) => {
                    tracing::warn!(value = %value, "Invalid PARLEY_SERVER_ID, using default");
                }
            }
        }

        if let Some(path) = lookup("PARLEY_SNAPSHOT_PATH") {
            if !path.is_empty() {
                config.snapshot_path = Some(PathBuf::from(path));
            }
        }

        if let Some(value) = lookup("PARLEY_SNAPSHOT_INTERVAL_MS") {
            match value.parse::<u64>() {
                Ok(ms) if ms > 0 => config.snapshot_interval = Duration::from_millis(ms),
                _ => {
                    tracing::warn!(
                        value = %value,
                        "Invalid PARLEY_SNAPSHOT_INTERVAL_MS, using default"
                    );
                }
            }
        }

        if let Some(value) = lookup("PARLEY_COMMAND_BUFFER") {
            match value.parse::<usize>() {
                Ok(n) if n > 0 => config.command_buffer = n,
                _ => {
                    tracing::warn!(value = %value, "Invalid PARLEY_COMMAND_BUFFER, using default");
                }
            }
        }

        config
    }
}
