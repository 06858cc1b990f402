// src/core/session.rs

//! Session tracking: in-memory sessions with append-only command history.
//!
//! Durable persistence is an external collaborator. When a `SessionStore`
//! is attached it is consulted on lookup misses and told about every
//! mutation; a failing store never fails the in-memory operation, the
//! in-memory state stays authoritative for the life of the process.

use crate::models::Session;
use anyhow::Result;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session '{id}' not found.")]
    NotFound { id: Uuid },
}

/// Narrow save/load interface for an optional persistence collaborator.
pub trait SessionStore {
    fn save(&mut self, session: &Session) -> Result<()>;
    fn load(&mut self, id: Uuid) -> Result<Option<Session>>;
}

/// Tracks sessions and their command history. Not internally synchronized;
/// concurrent access must be serialized by the caller.
#[derive(Default)]
pub struct SessionManager {
    sessions: BTreeMap<Uuid, Session>,
    store: Option<Box<dyn SessionStore>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Creates a new session and returns it.
    pub fn create(&mut self) -> &Session {
        let session = Session::new();
        let id = session.id();
        log::debug!("Created session '{}'", id);
        self.sessions.insert(id, session);
        self.persist(id);
        // Just inserted above.
        &self.sessions[&id]
    }

    /// Looks up a session, consulting the attached store on a miss.
    pub fn get(&mut self, id: Uuid) -> Result<&Session, SessionError> {
        if !self.sessions.contains_key(&id) {
            if let Some(store) = self.store.as_mut() {
                match store.load(id) {
                    Ok(Some(session)) => {
                        self.sessions.insert(id, session);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("Session store failed to load '{}': {:#}", id, e);
                    }
                }
            }
        }
        self.sessions.get(&id).ok_or(SessionError::NotFound { id })
    }

    /// Appends a command id to the session's history. Append-only: entries
    /// are never removed or reordered.
    pub fn append_command(&mut self, session_id: Uuid, command_id: Uuid) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound { id: session_id })?;
        session.push_command(command_id);
        self.persist(session_id);
        Ok(())
    }

    /// Refreshes the session's `last_activity` timestamp.
    pub fn touch(&mut self, session_id: Uuid) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound { id: session_id })?;
        session.touch();
        self.persist(session_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn persist(&mut self, id: Uuid) {
        if let (Some(store), Some(session)) = (self.store.as_mut(), self.sessions.get(&id)) {
            if let Err(e) = store.save(session) {
                log::warn!("Session store failed to save '{}': {:#}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_create_and_get() {
        let mut manager = SessionManager::new();
        let id = manager.create().id();
        let session = manager.get(id).unwrap();
        assert_eq!(session.id(), id);
        assert!(session.command_history().is_empty());
    }

    #[test]
    fn test_get_unknown_session() {
        let mut manager = SessionManager::new();
        let err = manager.get(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[test]
    fn test_history_is_append_only_and_ordered() {
        let mut manager = SessionManager::new();
        let id = manager.create().id();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        manager.append_command(id, first).unwrap();
        manager.append_command(id, second).unwrap();

        assert_eq!(manager.get(id).unwrap().command_history(), &[first, second]);
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let mut manager = SessionManager::new();
        let err = manager.append_command(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[test]
    fn test_touch_advances_last_activity() {
        let mut manager = SessionManager::new();
        let id = manager.create().id();
        let before = manager.get(id).unwrap().last_activity();

        std::thread::sleep(std::time::Duration::from_millis(5));
        manager.touch(id).unwrap();
        let after = manager.get(id).unwrap().last_activity();
        assert!(after >= before);
    }

    /// A store that records saved sessions, shared with the test body.
    struct RecordingStore {
        saved: Rc<RefCell<Vec<Uuid>>>,
        sessions: Rc<RefCell<BTreeMap<Uuid, Session>>>,
    }

    impl SessionStore for RecordingStore {
        fn save(&mut self, session: &Session) -> Result<()> {
            self.saved.borrow_mut().push(session.id());
            self.sessions
                .borrow_mut()
                .insert(session.id(), session.clone());
            Ok(())
        }

        fn load(&mut self, id: Uuid) -> Result<Option<Session>> {
            Ok(self.sessions.borrow().get(&id).cloned())
        }
    }

    #[test]
    fn test_store_sees_every_mutation_and_backs_misses() {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let sessions = Rc::new(RefCell::new(BTreeMap::new()));

        let id = {
            let mut manager = SessionManager::new().with_store(Box::new(RecordingStore {
                saved: Rc::clone(&saved),
                sessions: Rc::clone(&sessions),
            }));
            let id = manager.create().id();
            manager.append_command(id, Uuid::new_v4()).unwrap();
            id
        };
        // create + append each persisted once.
        assert_eq!(saved.borrow().len(), 2);

        // A fresh manager with the same store finds the session on a miss.
        let mut revived = SessionManager::new().with_store(Box::new(RecordingStore {
            saved: Rc::clone(&saved),
            sessions: Rc::clone(&sessions),
        }));
        let session = revived.get(id).unwrap();
        assert_eq!(session.command_history().len(), 1);
    }
}
