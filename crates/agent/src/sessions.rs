use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use teller_core::dialogue::DialogueState;
use tokio::sync::Mutex as SessionLock;
use tracing::{info, warn};

use crate::runtime::{DialogueRuntime, DialogueSession};

type SharedSession = Arc<SessionLock<DialogueSession>>;

/// Many concurrent conversations over one runtime.
///
/// Turns for the same session queue on that session's lock; different
/// sessions never contend beyond the brief map lookup. Sessions exist only
/// between `open`/`open_with_id` and `close`; turns for any other id are refused.
pub struct SessionRegistry {
    runtime: DialogueRuntime,
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(runtime: DialogueRuntime) -> Self {
        Self { runtime, sessions: Mutex::new(HashMap::new()) }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SharedSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Opens a fresh session and returns its id.
    pub fn open(&self) -> String {
        let session = self.runtime.open_session();
        let session_id = session.session_id().to_string();
        self.sessions().insert(session_id.clone(), Arc::new(SessionLock::new(session)));
        info!(event_name = "sessions.opened", session_id = %session_id);
        session_id
    }

    /// Opens a session under a caller-chosen id. Returns false if the id is taken.
    pub fn open_with_id(&self, session_id: impl Into<String>) -> bool {
        let session_id = session_id.into();
        let mut sessions = self.sessions();
        if sessions.contains_key(&session_id) {
            return false;
        }
        let session = self.runtime.open_session_with_id(session_id.clone());
        sessions.insert(session_id.clone(), Arc::new(SessionLock::new(session)));
        info!(event_name = "sessions.opened", session_id = %session_id);
        true
    }

    /// Runs one turn. Returns `None` when the session was never opened or is closed.
    pub async fn chat(&self, session_id: &str, utterance: &str) -> Option<String> {
        let Some(session) = self.sessions().get(session_id).cloned() else {
            warn!(event_name = "sessions.unknown", session_id = %session_id, "turn refused");
            return None;
        };
        let mut session = session.lock().await;
        Some(session.chat(utterance).await)
    }

    /// Returns false when no such session exists.
    pub async fn reset(&self, session_id: &str) -> bool {
        let Some(session) = self.sessions().get(session_id).cloned() else {
            return false;
        };
        session.lock().await.reset();
        true
    }

    pub async fn state(&self, session_id: &str) -> Option<DialogueState> {
        let session = self.sessions().get(session_id).cloned()?;
        let state = session.lock().await.state().snapshot();
        Some(state)
    }

    /// Drops the session's state. Its interaction records stay in the log.
    pub fn close(&self, session_id: &str) -> bool {
        let closed = self.sessions().remove(session_id).is_some();
        if closed {
            info!(event_name = "sessions.closed", session_id = %session_id);
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
