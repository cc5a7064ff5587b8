//! Per-browser copy of the user's session history.
//!
//! Refreshed on every successful list call; deletes are applied locally once
//! the backend confirms them, and the cached list stands in when the backend
//! cannot be reached.

use crate::models::{SessionId, SessionRecord};
use meditation_core::error::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

pub const HISTORY_CACHE_KEY: &str = "history_cache";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionCache {
    sessions: Vec<SessionRecord>,
}

impl SessionCache {
    pub fn new(sessions: Vec<SessionRecord>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    /// Drop a session. Returns whether it was cached.
    pub fn remove(&mut self, id: &SessionId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| &s.id != id);
        self.sessions.len() != before
    }

    /// Replace a cached session with a newer copy, or add it at the front.
    pub fn upsert(&mut self, record: SessionRecord) {
        match self.sessions.iter_mut().find(|s| s.id == record.id) {
            Some(existing) => *existing = record,
            None => self.sessions.insert(0, record),
        }
    }

    pub async fn load(session: &Session) -> Self {
        session
            .get::<SessionCache>(HISTORY_CACHE_KEY)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read history cache");
                None
            })
            .unwrap_or_default()
    }

    pub async fn store(&self, session: &Session) -> Result<(), AppError> {
        session
            .insert(HISTORY_CACHE_KEY, self)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, mood_after: Option<&str>) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(id),
            created_at: None,
            meditation_type: "focus".to_string(),
            duration: 10,
            tone: None,
            script: None,
            audio_url: None,
            preferences: None,
            mood_before: None,
            mood_after: mood_after.map(str::to_string),
            health_conditions: None,
        }
    }

    #[test]
    fn test_remove() {
        let mut cache = SessionCache::new(vec![record("1", None), record("2", None)]);
        assert!(cache.remove(&SessionId::new("1")));
        assert!(!cache.remove(&SessionId::new("1")));
        assert_eq!(cache.sessions().len(), 1);
        assert_eq!(cache.sessions()[0].id.as_str(), "2");
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut cache = SessionCache::new(vec![record("1", None), record("2", None)]);
        cache.upsert(record("2", Some("Calm")));
        cache.upsert(record("3", None));

        let ids: Vec<&str> = cache.sessions().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert_eq!(cache.sessions()[2].mood_after.as_deref(), Some("Calm"));
    }
}
