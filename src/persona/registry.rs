//! Bundled persona registry, source of the default rotation.

use serde::Deserialize;

use crate::error::{Error, Result};

use super::types::{Persona, PersonaRotation};

const BUNDLED_ROTATION: &str = include_str!("../../config/personas/default.toml");

#[derive(Deserialize)]
struct RotationFile {
    personas: Vec<Persona>,
}

/// Source of the rotation used when the configuration names no personas.
pub struct PersonaRegistry;

impl PersonaRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Raw TOML of the bundled rotation.
    pub fn bundled_toml(&self) -> &'static str {
        BUNDLED_ROTATION
    }

    /// Personas of the bundled rotation, in speaking order.
    pub fn bundled_personas(&self) -> Result<Vec<Persona>> {
        let file: RotationFile = toml::from_str(BUNDLED_ROTATION).map_err(|e| Error::ConfigParse {
            message: format!("bundled persona rotation: {}", e),
            source: Some(e),
        })?;
        Ok(file.personas)
    }

    /// Resolve the rotation: configured personas win, otherwise the bundled set.
    pub fn resolve(&self, configured: &[Persona]) -> Result<PersonaRotation> {
        if configured.is_empty() {
            PersonaRotation::new(self.bundled_personas()?)
        } else {
            PersonaRotation::new(configured.to_vec())
        }
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
