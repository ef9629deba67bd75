//! In-memory session store.
//!
//! The outer map lock is held only for lookup and insert; every session
//! carries its own mutex, so background units for unrelated sessions never
//! contend and a status read sees a consistent snapshot of exactly one
//! session. No lock is ever held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use super::model::InterviewSession;

type Shared<T> = Arc<Mutex<T>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Shared<InterviewSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: InterviewSession) -> Uuid {
        let id = session.id;
        self.inner
            .write()
            .expect("session map lock poisoned")
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    /// Runs `f` against the session under its own lock. `None` when the
    /// session id is unknown.
    pub fn read<T>(&self, id: Uuid, f: impl FnOnce(&InterviewSession) -> T) -> Option<T> {
        let session = self.get(id)?;
        let guard = session.lock().expect("session lock poisoned");
        Some(f(&guard))
    }

    /// Runs `f` with mutable access to the session under its own lock.
    /// `None` when the session id is unknown.
    pub fn update<T>(&self, id: Uuid, f: impl FnOnce(&mut InterviewSession) -> T) -> Option<T> {
        let session = self.get(id)?;
        let mut guard = session.lock().expect("session lock poisoned");
        Some(f(&mut guard))
    }

    fn get(&self, id: Uuid) -> Option<Shared<InterviewSession>> {
        self.inner
            .read()
            .expect("session map lock poisoned")
            .get(&id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::SessionStatus;

    #[test]
    fn read_and_update_roundtrip() {
        let store = SessionStore::new();
        let id = store.insert(InterviewSession::new(Uuid::new_v4(), "jd".to_string()));

        store.update(id, |s| {
            s.status = SessionStatus::Ready;
            s.questions.push("q1".to_string());
        });

        let (status, question) = store
            .read(id, |s| (s.status, s.current_question().map(String::from)))
            .unwrap();
        assert_eq!(status, SessionStatus::Ready);
        assert_eq!(question.as_deref(), Some("q1"));
    }

    #[test]
    fn unknown_id_is_none() {
        let store = SessionStore::new();
        assert!(store.read(Uuid::new_v4(), |_| ()).is_none());
        assert!(store.update(Uuid::new_v4(), |_| ()).is_none());
    }

    #[test]
    fn stores_are_isolated() {
        let a = SessionStore::new();
        let b = SessionStore::new();
        let id = a.insert(InterviewSession::new(Uuid::new_v4(), "jd".to_string()));
        assert!(b.read(id, |_| ()).is_none());
    }
}
