//! In-memory login sessions keyed by an opaque cookie value.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::UserId;

pub const SESSION_COOKIE: &str = "iscogram_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub csrf_token: String,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session and return its cookie value.
    pub fn create(&self, user_id: UserId) -> (String, Session) {
        let id = Uuid::new_v4().simple().to_string();
        let session = Session {
            user_id,
            csrf_token: Uuid::new_v4().simple().to_string(),
        };
        self.sessions.insert(id.clone(), session.clone());
        debug!(target = "infra::sessions::create", user_id, "session started");
        (id, session)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_remove() {
        let store = SessionStore::new();
        let (id, session) = store.create(7);

        assert_eq!(store.get(&id), Some(session.clone()));
        assert_eq!(session.user_id, 7);
        assert_eq!(session.csrf_token.len(), 32);

        let (other, _) = store.create(7);
        assert_ne!(id, other);
        assert_eq!(store.len(), 2);

        assert_eq!(store.remove(&id), Some(session));
        assert!(store.get(&id).is_none());
        assert!(store.remove("missing").is_none());
    }
}
