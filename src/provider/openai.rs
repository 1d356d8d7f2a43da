//! OpenAI-compatible chat completion provider
//!
//! Talks to any endpoint that speaks the OpenAI chat completions API
//! (OpenAI, Ollama, vLLM, LM Studio, etc.).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::TurnMessage;

use super::{CompletionProvider, ProviderHealth};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Request timeout in seconds (0 = no client-side timeout)
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [TurnMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Provider
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible chat completion provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %config.base_url, "OpenAI-compatible provider created");

        Ok(Self { config, client })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.config.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.config.api_key))
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, model_id: &str, messages: &[TurnMessage]) -> Result<String> {
        let start = Instant::now();
        let body = ChatCompletionRequest {
            model: model_id,
            messages,
        };

        let mut req = self.client.post(self.endpoint("chat/completions")).json(&body);
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::provider_request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::provider_malformed(format!("Failed to parse API response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider_malformed("No choices in API response"))?;

        let text = choice.message.content.ok_or_else(|| Error::ProviderEmpty {
            model_id: model_id.to_string(),
        })?;

        debug!(
            model = %model_id,
            messages = messages.len(),
            total_tokens = ?parsed.usage.map(|u| u.total_tokens),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );

        Ok(text)
    }

    async fn health_check(&self) -> Result<ProviderHealth> {
        let mut req = self.client.get(self.endpoint("models"));
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => Ok(ProviderHealth::default()),
            Ok(resp) => Ok(ProviderHealth {
                operational: false,
                error: Some(format!("API returned status {}", resp.status())),
            }),
            Err(e) => Ok(ProviderHealth {
                operational: false,
                error: Some(format!("Connection failed: {}", e)),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
