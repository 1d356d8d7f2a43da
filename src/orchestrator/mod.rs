//! Turn orchestration
//!
//! Owns the session registry and routes transport triggers to turns.
//! Sessions share one usage ledger and one provider; nothing else is shared.

pub mod events;
pub mod registry;
pub mod session;
pub mod turn;

use std::sync::Arc;

use tracing::debug;

use crate::ledger::UsageLedger;
use crate::persona::PersonaRotation;
use crate::provider::CompletionProvider;

pub use events::{ChatEvent, ERROR_SPEAKER, SYSTEM_SPEAKER};
pub use registry::{Session, SessionHandle, SessionRegistry};
pub use session::{SessionId, SessionState, Transcript};
pub use turn::{TurnOrchestrator, TurnOutcome};

/// Inbound signal from a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// First turn of a session.
    Start,
    /// Every turn after that.
    Advance,
}

/// A freshly registered session.
pub struct OpenSession {
    pub id: SessionId,
    pub handle: SessionHandle,
    /// Greeting with today's call count.
    pub status: ChatEvent,
}

/// Entry point used by the transport.
pub struct Orchestrator {
    turns: TurnOrchestrator,
    sessions: SessionRegistry,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<UsageLedger>,
        rotation: PersonaRotation,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            turns: TurnOrchestrator::new(ledger, rotation, provider),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn turns(&self) -> &TurnOrchestrator {
        &self.turns
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Register a new session along with the status notice to greet it with.
    pub fn open_session(&self) -> OpenSession {
        let id = SessionId::new();
        let handle = self.sessions.get_or_create(id);
        debug!(session = %id, live = self.sessions.len(), "Session opened");
        OpenSession {
            id,
            handle,
            status: self.turns.status_notice(),
        }
    }

    /// State for `id`, created empty if absent.
    pub fn session(&self, id: SessionId) -> SessionHandle {
        self.sessions.get_or_create(id)
    }

    /// Run one turn on `session`.
    ///
    /// Concurrent triggers on the same session queue behind each other.
    /// Returns `None` when the session was closed while the trigger waited;
    /// such a trigger never reaches the ledger or the provider.
    pub async fn trigger(&self, session: &SessionHandle, trigger: Trigger) -> Option<ChatEvent> {
        let mut state = session.lock().await;
        if session.is_closed() {
            debug!(session = %session.id(), ?trigger, "Session closed, trigger dropped");
            return None;
        }

        debug!(session = %session.id(), ?trigger, turn = state.turn_index, "Running turn");
        Some(self.turns.advance_turn(&mut state).await.into_event())
    }

    /// Tear down the session's state. Queued triggers are skipped; a turn
    /// already waiting on the provider runs to completion.
    pub fn close_session(&self, id: SessionId) {
        self.sessions.remove(id);
    }
}
