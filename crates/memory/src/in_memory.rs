//! In-memory session store — useful for testing and single-process deployments.
//!
//! Records are kept in their serialized form, exactly like the Redis backend,
//! and expire on a `tokio::time` clock so tests can pause and advance time.

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::message::{Role, Turn};
use parley_core::session::{SessionPolicy, SessionStore, StoredHistory, session_key};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info};

struct Record {
    payload: String,
    expires_at: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A session store that keeps records in a process-local map.
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<String, Record>>>,
    policy: SessionPolicy,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// Store a raw record under a session id, bypassing encoding.
    ///
    /// Lets callers simulate records written by another process.
    pub async fn put_raw(
        &self,
        session_id: &str,
        payload: impl Into<String>,
    ) -> Result<(), StoreError> {
        let record = Record {
            payload: payload.into(),
            expires_at: self.expiry(Instant::now())?,
        };
        self.records
            .write()
            .await
            .insert(session_key(session_id), record);
        Ok(())
    }

    fn expiry(&self, now: Instant) -> Result<Instant, StoreError> {
        now.checked_add(self.policy.ttl).ok_or_else(|| {
            StoreError::Command(format!(
                "session TTL of {}s is out of range",
                self.policy.ttl.as_secs()
            ))
        })
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn policy(&self) -> SessionPolicy {
        self.policy
    }

    async fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let records = self.records.read().await;
        Ok(records
            .get(&session_key(session_id))
            .is_some_and(|r| r.is_live(now)))
    }

    async fn load(&self, session_id: &str) -> Result<StoredHistory, StoreError> {
        let now = Instant::now();
        let records = self.records.read().await;
        let raw = records
            .get(&session_key(session_id))
            .filter(|r| r.is_live(now))
            .map(|r| r.payload.as_str());
        Ok(StoredHistory::decode(raw))
    }

    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<(), StoreError> {
        let key = session_key(session_id);
        let now = Instant::now();
        let expires_at = self.expiry(now)?;

        // Read-modify-write under one lock; the Redis backend has no such guard.
        let mut records = self.records.write().await;
        let raw = records
            .get(&key)
            .filter(|r| r.is_live(now))
            .map(|r| r.payload.as_str());

        let mut history = match StoredHistory::decode(raw) {
            StoredHistory::Corrupt { reason } => {
                error!(session_id, %reason, "Error decoding history, overwriting");
                Vec::new()
            }
            other => other.into_turns(),
        };

        self.policy
            .push_bounded(&mut history, Turn::new(role.clone(), content));
        let payload = StoredHistory::encode(&history)?;

        records.insert(
            key,
            Record {
                payload,
                expires_at,
            },
        );
        debug!(session_id, %role, turns = history.len(), "Appended turn, TTL refreshed");
        Ok(())
    }

    async fn reset(&self, session_id: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self.records.write().await.remove(&session_key(session_id));
        let existed = removed.is_some_and(|r| r.is_live(now));
        if existed {
            info!(session_id, "Session reset");
        } else {
            info!(session_id, "Session did not exist");
        }
        Ok(existed)
    }

    async fn ttl(&self, session_id: &str) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        let records = self.records.read().await;
        Ok(records
            .get(&session_key(session_id))
            .filter(|r| r.is_live(now))
            .map(|r| r.expires_at.duration_since(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_turns: usize) -> InMemorySessionStore {
        InMemorySessionStore::new(SessionPolicy::new(Duration::from_secs(600), max_turns))
    }

    #[tokio::test]
    async fn user_then_assistant_reads_back_in_order() {
        let store = store(20);
        store.append("s1", Role::User, "hi").await.unwrap();
        store.append("s1", Role::Assistant, "hello").await.unwrap();

        let history = store.get("s1").await.unwrap();
        assert_eq!(history, vec![Turn::user("hi"), Turn::assistant("hello")]);
    }

    #[tokio::test]
    async fn missing_session_is_absent_and_empty() {
        let store = store(20);
        assert!(!store.exists("missing").await.unwrap());
        assert!(store.get("missing").await.unwrap().is_empty());
        assert_eq!(store.load("missing").await.unwrap(), StoredHistory::Absent);
        assert_eq!(store.ttl("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn bound_keeps_only_last_turns() {
        let store = store(2);
        for i in 0..3 {
            store.append("s", Role::User, &format!("q{i}")).await.unwrap();
            store.append("s", Role::Assistant, &format!("a{i}")).await.unwrap();
        }
        let history = store.get("s").await.unwrap();
        assert_eq!(history, vec![Turn::user("q2"), Turn::assistant("a2")]);
    }

    #[tokio::test]
    async fn count_never_exceeds_bound() {
        let store = store(5);
        for i in 0..12usize {
            store.append("s", Role::User, &i.to_string()).await.unwrap();
            let history = store.get("s").await.unwrap();
            assert_eq!(history.len(), (i + 1).min(5));
            assert_eq!(history.last().unwrap().content, i.to_string());
            assert_eq!(history[0].content, (i + 1).saturating_sub(5).to_string());
        }
    }

    #[tokio::test]
    async fn append_extends_prior_history() {
        let store = store(20);
        store.append("s", Role::User, "one").await.unwrap();
        let before = store.get("s").await.unwrap();

        store.append("s", Role::Assistant, "two").await.unwrap();
        let after = store.get("s").await.unwrap();

        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.last(), Some(&Turn::assistant("two")));
    }

    #[tokio::test(start_paused = true)]
    async fn append_resets_ttl_to_full_duration() {
        let store = store(20);
        store.append("s", Role::User, "hi").await.unwrap();
        assert_eq!(store.ttl("s").await.unwrap(), Some(Duration::from_secs(600)));

        tokio::time::advance(Duration::from_secs(590)).await;
        assert_eq!(store.ttl("s").await.unwrap(), Some(Duration::from_secs(10)));

        store.append("s", Role::Assistant, "hello").await.unwrap();
        assert_eq!(store.ttl("s").await.unwrap(), Some(Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn lapsed_session_reads_as_absent() {
        let store = store(20);
        store.append("s", Role::User, "hi").await.unwrap();

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(!store.exists("s").await.unwrap());
        assert!(store.get("s").await.unwrap().is_empty());
        assert!(!store.reset("s").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn append_after_lapse_starts_fresh() {
        let store = store(20);
        store.append("s", Role::User, "old").await.unwrap();
        tokio::time::advance(Duration::from_secs(700)).await;

        store.append("s", Role::User, "new").await.unwrap();
        assert_eq!(store.get("s").await.unwrap(), vec![Turn::user("new")]);
    }

    #[tokio::test]
    async fn reset_removes_session() {
        let store = store(20);
        store.append("s", Role::User, "hi").await.unwrap();

        assert!(store.reset("s").await.unwrap());
        assert!(!store.exists("s").await.unwrap());
        assert!(store.get("s").await.unwrap().is_empty());

        // Idempotent: second reset succeeds and reports nothing removed.
        assert!(!store.reset("s").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_empty() {
        let store = store(20);
        store.put_raw("bad", "not json at all").await.unwrap();

        assert!(store.exists("bad").await.unwrap());
        assert!(matches!(
            store.load("bad").await.unwrap(),
            StoredHistory::Corrupt { .. }
        ));
        assert!(store.get("bad").await.unwrap().is_empty());

        store.append("bad", Role::User, "fresh").await.unwrap();
        assert_eq!(store.get("bad").await.unwrap(), vec![Turn::user("fresh")]);
    }

    #[tokio::test]
    async fn unknown_roles_survive_round_trip() {
        let store = store(20);
        store
            .put_raw("s", r#"[{"role":"system","content":"be brief"}]"#)
            .await
            .unwrap();
        store.append("s", Role::User, "hi").await.unwrap();

        let history = store.get("s").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Other("system".into()));
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_an_error_not_a_panic() {
        let store = InMemorySessionStore::new(SessionPolicy::new(Duration::MAX, 20));

        let err = store.append("s", Role::User, "hi").await.unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
        assert!(!err.is_transient());
        assert!(!store.exists("s").await.unwrap());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = store(20);
        store.append("a", Role::User, "for a").await.unwrap();
        store.append("b", Role::User, "for b").await.unwrap();
        store.reset("a").await.unwrap();

        assert_eq!(store.get("b").await.unwrap(), vec![Turn::user("for b")]);
        assert_eq!(store.len().await, 1);
    }
}
