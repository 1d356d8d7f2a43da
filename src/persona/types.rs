//! Core types for the persona rotation.
//!
//! A persona is one configured speaker: the name shown to the viewer, the
//! model it is served by, and the system prompt that frames its replies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// One speaker in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Name attached to every message this persona produces.
    pub display_name: String,

    /// Model identifier passed to the completion provider.
    pub model_id: String,

    /// System prompt synthesized at the head of every call.
    pub system_prompt: String,
}

impl Persona {
    pub fn new(
        display_name: impl Into<String>,
        model_id: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            model_id: model_id.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.model_id)
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Rotation
// ─────────────────────────────────────────────────────────────────

/// Ordered, cyclic list of personas. Never empty.
#[derive(Debug, Clone)]
pub struct PersonaRotation {
    personas: Vec<Persona>,
}

impl PersonaRotation {
    /// Build a rotation. An empty list is a configuration error.
    pub fn new(personas: Vec<Persona>) -> Result<Self> {
        if personas.is_empty() {
            return Err(Error::config_field_invalid(
                "personas",
                "persona rotation must contain at least one persona",
            ));
        }
        Ok(Self { personas })
    }

    /// Persona whose turn it is at `turn_index`.
    pub fn persona_for_turn(&self, turn_index: u64) -> &Persona {
        let slot = (turn_index % self.personas.len() as u64) as usize;
        &self.personas[slot]
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
