//! Session registry
//!
//! Maps each live session to its state. Entries are created on connect or on
//! the first trigger and removed when the connection closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::session::{SessionId, SessionState};

/// One session's state and whether its viewer is still around.
///
/// The state lock is held for a whole turn, so triggers on the same session
/// run one after another.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
    closed: AtomicBool,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Mark the session torn down. Turns still waiting on the lock are skipped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Shared handle to one session.
pub type SessionHandle = Arc<Session>;

/// Registry of live sessions
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `id`, created empty if absent.
    pub fn get_or_create(&self, id: SessionId) -> SessionHandle {
        if let Some(handle) = self.sessions.read().get(&id) {
            return handle.clone();
        }

        self.sessions
            .write()
            .entry(id)
            .or_insert_with(|| {
                debug!(session = %id, "Session created");
                Arc::new(Session::new(id))
            })
            .clone()
    }

    pub fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().get(&id).cloned()
    }

    /// Close and drop a session. Returns true if it existed.
    pub fn remove(&self, id: SessionId) -> bool {
        match self.sessions.write().remove(&id) {
            Some(session) => {
                session.close();
                debug!(session = %id, "Session removed");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
