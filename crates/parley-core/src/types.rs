//! Strong type definitions for Parley.
//!
//! Every user, conversation, and message is named by a [`Uuid`]. Entities
//! never hold references to each other, only identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Length of the binary form of a [`Uuid`].
pub const UUID_LEN: usize = 16;

/// A 16-byte entity identifier.
///
/// Fields are ordered by significance: the clock value at creation, the
/// identity of the server that created it, and a nonce. The derived ordering
/// therefore follows creation time, and the big-endian byte form sorts the
/// same way as the value itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Uuid {
    time: u64,
    server: u32,
    nonce: u32,
}

impl Uuid {
    /// The "no entity" identifier.
    pub const NIL: Self = Self {
        time: 0,
        server: 0,
        nonce: 0,
    };

    /// Create an identifier from its parts.
    pub const fn new(time: u64, server: u32, nonce: u32) -> Self {
        Self {
            time,
            server,
            nonce,
        }
    }

    /// Whether this is [`Uuid::NIL`].
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Clock value (Unix ms) the identifier was generated at.
    pub const fn time(&self) -> u64 {
        self.time
    }

    /// Identity of the generating server.
    pub const fn server(&self) -> u32 {
        self.server
    }

    pub const fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Big-endian binary form.
    pub fn to_bytes(&self) -> [u8; UUID_LEN] {
        let mut out = [0u8; UUID_LEN];
        out[..8].copy_from_slice(&self.time.to_be_bytes());
        out[8..12].copy_from_slice(&self.server.to_be_bytes());
        out[12..].copy_from_slice(&self.nonce.to_be_bytes());
        out
    }

    /// Rebuild from the big-endian binary form.
    pub fn from_bytes(bytes: [u8; UUID_LEN]) -> Self {
        let mut time = [0u8; 8];
        let mut server = [0u8; 4];
        let mut nonce = [0u8; 4];
        time.copy_from_slice(&bytes[..8]);
        server.copy_from_slice(&bytes[8..12]);
        nonce.copy_from_slice(&bytes[12..]);
        Self {
            time: u64::from_be_bytes(time),
            server: u32::from_be_bytes(server),
            nonce: u32::from_be_bytes(nonce),
        }
    }

    /// Convert to a 32-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::invalid_identifier(s, e.to_string()))?;
        let arr: [u8; UUID_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::invalid_identifier(s, format!("expected {} bytes", UUID_LEN))
        })?;
        Ok(Self::from_bytes(arr))
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self::NIL
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uuid({})", self.to_hex())
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Uuid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<Uuid> for String {
    fn from(id: Uuid) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for Uuid {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}
