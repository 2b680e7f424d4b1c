//! In-memory session store with idle expiry

use super::{Session, UserId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
    session: Session,
    touched_at: Instant,
}

impl Entry {
    fn new(session: Session) -> Self {
        Self {
            session,
            touched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() > ttl
    }
}

/// Owns every live session, keyed by user id.
///
/// Sessions untouched for longer than the TTL are treated as absent.
/// Nothing survives a restart.
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get the user's session, creating a fresh one if absent or expired
    pub async fn get_or_create(&self, user_id: UserId) -> Session {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&user_id) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                entry.touched_at = Instant::now();
                entry.session.clone()
            }
            Some(entry) => {
                tracing::info!(
                    user_id,
                    idle_secs = entry.touched_at.elapsed().as_secs(),
                    "Session expired, starting fresh"
                );
                *entry = Entry::new(Session::default());
                entry.session.clone()
            }
            None => {
                tracing::debug!(user_id, "Creating session");
                let session = Session::default();
                sessions.insert(user_id, Entry::new(session.clone()));
                session
            }
        }
    }

    /// Current session without creating one. Expired sessions read as absent.
    #[allow(dead_code)] // Used by runtime tests
    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&user_id)
            .filter(|entry| !entry.is_expired(self.ttl))
            .map(|entry| entry.session.clone())
    }

    /// Store the session and refresh its expiry
    pub async fn save(&self, user_id: UserId, session: Session) {
        self.sessions
            .write()
            .await
            .insert(user_id, Entry::new(session));
    }

    /// Delete the session; the next event starts from scratch
    pub async fn reset(&self, user_id: UserId) {
        if self.sessions.write().await.remove(&user_id).is_some() {
            tracing::debug!(user_id, "Session deleted");
        }
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.ttl));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
