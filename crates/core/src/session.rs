//! SessionStore trait — TTL-bounded, length-bounded conversation storage.
//!
//! A session is created implicitly by its first successful append and
//! destroyed by an explicit reset or by TTL lapse. Every append rewrites the
//! whole record and resets the TTL to its full duration (sliding expiration).
//!
//! Implementations: Redis (production), in-memory (tests and single-process use).

use crate::error::StoreError;
use crate::message::{Role, Turn};
use async_trait::async_trait;
use std::time::Duration;

/// Prefix for every session record key.
pub const KEY_PREFIX: &str = "session:";

/// The store key for a session id.
pub fn session_key(session_id: &str) -> String {
    format!("{KEY_PREFIX}{session_id}")
}

/// Retention rules shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Time-to-live applied on every successful write.
    pub ttl: Duration,
    /// Maximum turns kept per session; oldest are evicted first.
    pub max_turns: usize,
}

impl SessionPolicy {
    pub fn new(ttl: Duration, max_turns: usize) -> Self {
        Self { ttl, max_turns }
    }

    /// Append `turn` and drop the oldest turns beyond `max_turns`.
    pub fn push_bounded(&self, history: &mut Vec<Turn>, turn: Turn) {
        history.push(turn);
        if history.len() > self.max_turns {
            let excess = history.len() - self.max_turns;
            history.drain(..excess);
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_turns: 20,
        }
    }
}

/// The result of reading a session record, distinguishing "absent" from
/// "present but unreadable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredHistory {
    Absent,
    Found(Vec<Turn>),
    Corrupt { reason: String },
}

impl StoredHistory {
    /// Decode a raw record as read from the store.
    pub fn decode(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Absent,
            Some(data) => match serde_json::from_str::<Vec<Turn>>(data) {
                Ok(turns) => Self::Found(turns),
                Err(e) => Self::Corrupt {
                    reason: e.to_string(),
                },
            },
        }
    }

    /// Encode turns into the record format.
    pub fn encode(turns: &[Turn]) -> Result<String, StoreError> {
        serde_json::to_string(turns).map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// The stored turns; absent and corrupt records both yield nothing.
    pub fn into_turns(self) -> Vec<Turn> {
        match self {
            Self::Found(turns) => turns,
            Self::Absent | Self::Corrupt { .. } => Vec::new(),
        }
    }
}

/// The core SessionStore trait.
///
/// Every call may fail with a [`StoreError`]; a timeout or a lost connection
/// is reported as such and is never mistaken for an absent session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "redis", "in_memory").
    fn name(&self) -> &str;

    /// Retention rules this store enforces.
    fn policy(&self) -> SessionPolicy;

    /// Whether the session key is currently present (not expired, not reset).
    async fn exists(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Read the raw session record.
    async fn load(&self, session_id: &str) -> Result<StoredHistory, StoreError>;

    /// Read the session history, treating absent and corrupt records as empty.
    ///
    /// Corruption is logged here and never raised.
    async fn get(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        match self.load(session_id).await? {
            StoredHistory::Absent => {
                tracing::debug!(session_id, "No history found");
                Ok(Vec::new())
            }
            StoredHistory::Found(turns) => {
                tracing::debug!(session_id, turns = turns.len(), "Retrieved history");
                Ok(turns)
            }
            StoredHistory::Corrupt { reason } => {
                tracing::error!(session_id, %reason, "Error decoding history, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Append a turn, keep the last `max_turns`, write back and reset the TTL.
    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<(), StoreError>;

    /// Delete the session immediately. Returns whether a record existed.
    async fn reset(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Remaining time-to-live, `None` when the session is absent.
    async fn ttl(&self, session_id: &str) -> Result<Option<Duration>, StoreError>;

    /// Can we reach the store?
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    /// Release connections held by this handle.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
