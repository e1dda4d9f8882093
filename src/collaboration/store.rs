//! In-memory session store.
//!
//! Each session lives behind its own mutex so that transitions on one session
//! never wait on another. The outer map lock is only held to look up, insert
//! or remove entries.

use crate::types::{CollaborationSession, Message};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A session and its append-only history.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: CollaborationSession,
    pub history: Vec<Message>,
}

impl SessionRecord {
    pub fn new(session: CollaborationSession) -> Self {
        Self {
            session,
            history: Vec::new(),
        }
    }
}

pub type SessionHandle = Arc<Mutex<SessionRecord>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: SessionRecord) -> SessionHandle {
        let id = record.session.session_id.clone();
        let handle = Arc::new(Mutex::new(record));
        self.sessions.write().insert(id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.write().remove(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Clones of every stored session, in no particular order.
    pub fn sessions(&self) -> Vec<CollaborationSession> {
        let handles: Vec<SessionHandle> = self.sessions.read().values().cloned().collect();
        handles
            .iter()
            .map(|handle| handle.lock().session.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
