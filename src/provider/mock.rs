//! Mock provider for testing and offline runs
//!
//! Replies come from a script when one is queued, otherwise a deterministic
//! line naming the model and the turn. Every call is recorded.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::TurnMessage;

use super::CompletionProvider;

// ─────────────────────────────────────────────────────────────────
// Mock Configuration
// ─────────────────────────────────────────────────────────────────

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this text, verbatim.
    Text(String),
    /// Fail with a provider error.
    Fail(String),
}

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Simulated latency per call (ms)
    pub latency_ms: u64,

    /// Fail every call not covered by the script
    pub fail_unscripted: bool,
}

/// A call as the provider saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_id: String,
    pub messages: Vec<TurnMessage>,
}

// ─────────────────────────────────────────────────────────────────
// Mock Provider
// ─────────────────────────────────────────────────────────────────

/// Scripted CompletionProvider
pub struct MockProvider {
    config: MockConfig,
    script: RwLock<VecDeque<MockReply>>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MockProvider {
    /// Create a mock that always succeeds
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            script: RwLock::new(VecDeque::new()),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Create a mock that fails every call
    pub fn failing() -> Self {
        Self::with_config(MockConfig {
            fail_unscripted: true,
            ..Default::default()
        })
    }

    /// Queue outcomes for the next calls, in order
    pub fn script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.script.write().extend(replies);
        self
    }

    /// Queue one more outcome
    pub fn push_reply(&self, reply: MockReply) {
        self.script.write().push_back(reply);
    }

    /// Number of calls that reached the provider
    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().clone()
    }

    /// Most recent call, if any
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.read().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, model_id: &str, messages: &[TurnMessage]) -> Result<String> {
        let turn = {
            let mut calls = self.calls.write();
            calls.push(RecordedCall {
                model_id: model_id.to_string(),
                messages: messages.to_vec(),
            });
            calls.len()
        };

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let scripted = self.script.write().pop_front();
        match scripted {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(Error::provider_request(message)),
            None if self.config.fail_unscripted => {
                Err(Error::provider_request("mock provider configured to fail"))
            }
            None => Ok(format!("{} says hello (call {})", model_id, turn)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
