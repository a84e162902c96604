//! Browser session management
//!
//! Tracks sessions by cookie id. Each session carries the credential slot the
//! envelope operations read and write; nothing is shared across sessions.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::CredentialSlot;

/// Explicit per-session context passed into every core operation
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    credential: CredentialSlot,
    last_activity_ms: AtomicI64,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            session_id: session_id.into(),
            credential: CredentialSlot::new(),
            last_activity_ms: AtomicI64::new(now),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn credential(&self) -> &CredentialSlot {
        &self.credential
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Idle for at least `ttl` as of `now_ms`
    pub fn is_idle_at(&self, now_ms: i64, ttl: Duration) -> bool {
        let idle = now_ms - self.last_activity_ms.load(Ordering::Relaxed);
        idle >= ttl.as_millis() as i64
    }
}

/// In-memory session store with idle expiration
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionContext>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resume the session named by the cookie, or start a new one
    ///
    /// Returns the context and whether it was newly created.
    pub fn resolve(&self, session_id: Option<&str>) -> (Arc<SessionContext>, bool) {
        let now = Utc::now().timestamp_millis();

        if let Some(id) = session_id {
            if let Some(session) = self.sessions.get(id) {
                if !session.is_idle_at(now, self.ttl) {
                    session.touch();
                    return (Arc::clone(session.value()), false);
                }
            }
            // Expired or unknown ids are replaced, never revived
            self.sessions.remove(id);
        }

        let session = Arc::new(SessionContext::new(format!("sess_{}", uuid::Uuid::new_v4())));
        self.sessions
            .insert(session.session_id().to_string(), Arc::clone(&session));
        debug!(session_id = %session.session_id(), "Created new session");
        (session, true)
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SessionContext>> {
        self.sessions.get(session_id).map(|s| Arc::clone(s.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove sessions idle past the TTL, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_idle_at(now, self.ttl));
        before.saturating_sub(self.sessions.len())
    }

    pub fn stats(&self) -> SessionStoreStats {
        let now = Utc::now().timestamp_millis();
        let total = self.sessions.len();
        let idle = self
            .sessions
            .iter()
            .filter(|s| s.is_idle_at(now, self.ttl))
            .count();

        SessionStoreStats {
            total_sessions: total,
            expired_sessions: idle,
            active_sessions: total - idle,
        }
    }
}

/// Session store statistics
#[derive(Debug, Clone, Serialize)]
pub struct SessionStoreStats {
    pub total_sessions: usize,
    pub expired_sessions: usize,
    pub active_sessions: usize,
}

/// Periodically drop idle sessions (and the credentials they hold)
pub fn spawn_cleanup_task(store: Arc<SessionStore>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = store.cleanup();
            if removed > 0 {
                debug!("Session cleanup: removed {} idle sessions", removed);
            }
        }
    });
    info!("Session cleanup task started (every {}s)", interval.as_secs());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_creates_then_resumes() {
        let store = SessionStore::new(Duration::from_secs(3600));

        let (first, created) = store.resolve(None);
        assert!(created);
        assert!(first.session_id().starts_with("sess_"));

        let (second, created) = store.resolve(Some(first.session_id()));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_gets_fresh_session() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let (session, created) = store.resolve(Some("sess_forged"));
        assert!(created);
        assert_ne!(session.session_id(), "sess_forged");
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::ZERO);
        let (first, _) = store.resolve(None);

        let (second, created) = store.resolve(Some(first.session_id()));
        assert!(created);
        assert_ne!(first.session_id(), second.session_id());
        assert!(store.get(first.session_id()).is_none());

        assert_eq!(store.cleanup(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_credential_slot_is_per_session() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let (a, _) = store.resolve(None);
        let (b, _) = store.resolve(None);

        a.credential()
            .store(crate::auth::SessionCredential::new("tok", Utc::now()))
            .await;

        assert!(a.credential().current().await.is_some());
        assert!(b.credential().current().await.is_none());
    }

    #[test]
    fn test_stats() {
        let store = SessionStore::new(Duration::from_secs(3600));
        store.resolve(None);
        store.resolve(None);
        let stats = store.stats();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.active_sessions, 2);
    }
}
