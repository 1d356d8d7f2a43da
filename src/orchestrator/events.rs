//! Chat events emitted to the viewer.

use serde::{Deserialize, Serialize};

/// Speaker used for status and limit notices.
pub const SYSTEM_SPEAKER: &str = "System";

/// Speaker used for failure notices.
pub const ERROR_SPEAKER: &str = "Error";

/// One line of chat as the viewer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub speaker: String,
    pub text: String,
}

impl ChatEvent {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ERROR_SPEAKER, text)
    }

    /// Informational notice sent when a session opens.
    pub fn status(count: u32, limit: u32) -> Self {
        Self::system(format!("API calls today: {}/{}", count, limit))
    }

    pub fn limit_reached(limit: u32) -> Self {
        Self::system(format!(
            "Daily API limit reached ({} calls). Please try again tomorrow to prevent excessive OpenAI API costs.",
            limit
        ))
    }

    /// Generic failure notice. Provider details stay in the logs.
    pub fn provider_failure() -> Self {
        Self::error("An error occurred while communicating with the AI. Please try again.")
    }

    pub fn is_system(&self) -> bool {
        self.speaker == SYSTEM_SPEAKER
    }

    pub fn is_error(&self) -> bool {
        self.speaker == ERROR_SPEAKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_speakers() {
        assert!(ChatEvent::status(3, 20).is_system());
        assert!(ChatEvent::limit_reached(20).is_system());
        assert!(ChatEvent::provider_failure().is_error());
        assert!(!ChatEvent::new("GPT-4", "hi").is_system());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ChatEvent::status(3, 20).text, "API calls today: 3/20");
    }

    #[test]
    fn test_limit_text_names_limit() {
        assert_eq!(
            ChatEvent::limit_reached(2).text,
            "Daily API limit reached (2 calls). Please try again tomorrow to prevent excessive OpenAI API costs."
        );
    }
}
