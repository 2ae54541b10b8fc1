use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::chat::SessionId;
use crate::utils::error::ApiError;
use super::session::{Session, SessionDefaults};

/// Shared handle to one conversation. The lock serialises asks per session.
pub type SessionHandle = Arc<Mutex<Session>>;

struct StoreEntry {
    session: SessionHandle,
    last_access: Instant,
}

impl StoreEntry {
    fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            last_access: Instant::now(),
        }
    }
}

/// Thread-safe in-memory session store keyed by session id
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<DashMap<SessionId, StoreEntry>>,
    defaults: Arc<SessionDefaults>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(defaults: Arc<SessionDefaults>, idle_ttl: Duration, max_sessions: usize) -> Self {
        info!(
            "Initializing session store: ttl={:?}, max_sessions={}, window={:?}",
            idle_ttl, max_sessions, defaults.capacity
        );
        Self {
            storage: Arc::new(DashMap::new()),
            defaults,
            idle_ttl,
            max_sessions,
        }
    }

    pub fn defaults(&self) -> &Arc<SessionDefaults> {
        &self.defaults
    }

    pub fn generate_session_id() -> SessionId {
        uuid::Uuid::new_v4().to_string()
    }

    /// Get session handle by id.
    /// Returns None if not found or idle for longer than the ttl.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let mut entry = self.storage.get_mut(session_id)?;

        // Lazy expiration
        if entry.last_access.elapsed() > self.idle_ttl {
            drop(entry); // Release shard lock before removing
            self.remove(session_id);
            debug!("Session {} expired, removed from store", session_id);
            return None;
        }

        entry.last_access = Instant::now();
        Some(entry.session.clone())
    }

    /// Look up `session_id`, or open a new session when it is absent
    pub fn get_or_create(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<(SessionId, SessionHandle), ApiError> {
        if let Some(id) = &session_id {
            if let Some(handle) = self.get(id) {
                return Ok((id.clone(), handle));
            }
        }

        self.ensure_capacity()?;

        let id = session_id.unwrap_or_else(Self::generate_session_id);
        let handle = self
            .storage
            .entry(id.clone())
            .or_insert_with(|| StoreEntry::new(Session::new(self.defaults.clone())))
            .session
            .clone();

        info!("Opened session {} ({} active)", id, self.len());
        Ok((id, handle))
    }

    /// Install a fresh session under `session_id`, dropping whatever was there
    pub fn replace(&self, session_id: SessionId, session: Session) -> Result<SessionHandle, ApiError> {
        if !self.storage.contains_key(&session_id) {
            self.ensure_capacity()?;
        }

        let entry = StoreEntry::new(session);
        let handle = entry.session.clone();
        if self.storage.insert(session_id.clone(), entry).is_some() {
            debug!("Replaced session {}", session_id);
        }
        Ok(handle)
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.storage.remove(session_id).map(|(_, entry)| entry.session)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn ensure_capacity(&self) -> Result<(), ApiError> {
        if self.storage.len() >= self.max_sessions {
            warn!("Session limit reached ({}), rejecting new session", self.max_sessions);
            return Err(ApiError::ServiceUnavailable(format!(
                "session limit reached ({}), try again later",
                self.max_sessions
            )));
        }
        Ok(())
    }

    /// Drop sessions idle past the ttl. Returns number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let start_len = self.storage.len();
        let ttl = self.idle_ttl;
        self.storage.retain(|_, entry| entry.last_access.elapsed() <= ttl);
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} idle sessions", count);
        }

        count
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            active_sessions: self.len(),
            max_sessions: self.max_sessions,
            window_size: self.defaults.capacity.limit(),
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub active_sessions: usize,
    pub max_sessions: usize,
    /// None when the window is unbounded
    pub window_size: Option<usize>,
}
