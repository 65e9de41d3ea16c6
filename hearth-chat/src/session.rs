//! Session lifecycle: resume the latest conversation or start a new one.

use hearth_core::error::Result;
use hearth_core::store::MessageStore;
use hearth_core::types::Session;
use tracing::info;

/// Creates and resumes sessions, keeping the stored count under a cap.
#[derive(Debug, Clone, Copy)]
pub struct SessionService {
    max_session_count: usize,
}

impl SessionService {
    /// `max_session_count == 0` disables eviction.
    #[must_use]
    pub fn new(max_session_count: usize) -> Self {
        Self { max_session_count }
    }

    /// Current cap.
    #[must_use]
    pub fn max_session_count(&self) -> usize {
        self.max_session_count
    }

    /// Change the cap; applies on the next session creation.
    pub fn set_max_session_count(&mut self, max: usize) {
        self.max_session_count = max;
    }

    /// The most recently active session, or a fresh one for
    /// `default_character` when the store is empty.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn resume_or_create<S: MessageStore>(&self, store: &S, default_character: &str) -> Result<Session> {
        if let Some(session) = store.get_latest_session()? {
            info!(session = %session.id, character = %session.character_id, "Resuming session");
            return Ok(session);
        }
        self.create_new(store, default_character)
    }

    /// Persist a new session for `character_id`, then evict the oldest
    /// sessions beyond the cap.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn create_new<S: MessageStore>(&self, store: &S, character_id: &str) -> Result<Session> {
        let session = Session::new(character_id);
        store.upsert_session(&session)?;
        let evicted = store.enforce_max_sessions(self.max_session_count)?;
        info!(session = %session.id, character = character_id, evicted, "Created session");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::store::SqliteStore;

    #[test]
    fn empty_store_creates_default_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = SessionService::new(10);
        let session = service.resume_or_create(&store, "tokina").unwrap();
        assert_eq!(session.character_id, "tokina");
        assert_eq!(store.session_count().unwrap(), 1);
    }

    #[test]
    fn latest_session_is_resumed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = SessionService::new(10);
        let created = service.create_new(&store, "vera").unwrap();
        let resumed = service.resume_or_create(&store, "tokina").unwrap();
        assert_eq!(resumed.id, created.id);
        assert_eq!(resumed.character_id, "vera");
    }

    #[test]
    fn creation_enforces_cap() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = SessionService::new(2);
        for _ in 0..4 {
            service.create_new(&store, "tokina").unwrap();
        }
        assert_eq!(store.session_count().unwrap(), 2);
    }
}
