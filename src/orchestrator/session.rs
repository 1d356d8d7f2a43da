//! Per-connection conversation state.

use std::fmt;

use uuid::Uuid;

use crate::persona::Persona;
use crate::types::TurnMessage;

/// Identifies one viewer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replies produced so far in one session, oldest first.
///
/// Holds assistant messages only; it grows until the session ends.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<TurnMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&mut self, text: impl Into<String>) {
        self.messages.push(TurnMessage::assistant(text));
    }

    pub fn messages(&self) -> &[TurnMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// State owned by one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Selects the active persona; advances only after a successful turn.
    pub turn_index: u64,
    pub transcript: Transcript,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conditioning context for `persona`: its system prompt, then every reply so far.
    pub fn context_for(&self, persona: &Persona) -> Vec<TurnMessage> {
        let mut context = Vec::with_capacity(self.transcript.len() + 1);
        context.push(TurnMessage::system(persona.system_prompt.clone()));
        context.extend(self.transcript.messages().iter().cloned());
        context
    }

    /// Commit a successful turn.
    pub(crate) fn record_reply(&mut self, text: impl Into<String>) {
        self.transcript.push_reply(text);
        self.turn_index += 1;
    }
}
