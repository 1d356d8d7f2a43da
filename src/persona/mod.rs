//! Persona rotation: the ordered set of speakers that take turns.
//!
//! The rotation is fixed at startup. Turn `n` belongs to persona
//! `n mod len`, so every speaker sees the replies of all the others.

pub mod registry;
pub mod types;

pub use registry::PersonaRegistry;
pub use types::{Persona, PersonaRotation};
