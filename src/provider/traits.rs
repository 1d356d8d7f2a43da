//! Provider trait definitions
//!
//! Defines the CompletionProvider trait that every model backend implements.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::TurnMessage;

/// Health status of a provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Whether the provider answered
    pub operational: bool,

    /// Any error message
    pub error: Option<String>,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self {
            operational: true,
            error: None,
        }
    }
}

/// A source of generated replies.
///
/// One call is one attempt: implementations do not retry. Any failure,
/// including a response without usable text, comes back as an error.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Generate the next reply for `model_id` conditioned on `messages`.
    async fn complete(&self, model_id: &str, messages: &[TurnMessage]) -> Result<String>;

    /// Probe the provider without spending a completion
    async fn health_check(&self) -> Result<ProviderHealth> {
        Ok(ProviderHealth::default())
    }
}
