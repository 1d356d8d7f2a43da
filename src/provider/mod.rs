//! Completion providers
//!
//! The orchestrator only sees the [`CompletionProvider`] trait. Two
//! implementations ship: an OpenAI-compatible HTTP client and a scripted mock.

mod mock;
mod openai;
mod traits;

use std::sync::Arc;

pub use mock::{MockConfig, MockProvider, MockReply, RecordedCall};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use traits::{CompletionProvider, ProviderHealth};

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::Result;

/// Build the provider named by the configuration.
pub fn from_settings(settings: &ProviderSettings) -> Result<Arc<dyn CompletionProvider>> {
    match settings.kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(OpenAiConfig {
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            timeout_secs: settings.timeout_secs,
        })?)),
        ProviderKind::Mock => Ok(Arc::new(MockProvider::with_config(MockConfig {
            latency_ms: settings.mock_latency_ms,
            fail_unscripted: false,
        }))),
    }
}
