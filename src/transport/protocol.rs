//! Wire messages between viewer and relay.
//!
//! Messages are JSON objects with a `type` discriminator. Inbound frames
//! may also be the bare trigger word (`start`, `advance`, `next`).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::orchestrator::{ChatEvent, Trigger};

/// Viewer to relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Start,
    #[serde(alias = "next")]
    Advance,
}

impl ClientMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        match trimmed {
            "start" => return Ok(ClientMessage::Start),
            "advance" | "next" => return Ok(ClientMessage::Advance),
            _ => {}
        }

        serde_json::from_str(trimmed).map_err(|e| Error::ProtocolMalformed {
            message: format!("unrecognized frame: {}", e),
        })
    }

    pub fn trigger(self) -> Trigger {
        match self {
            ClientMessage::Start => Trigger::Start,
            ClientMessage::Advance => Trigger::Advance,
        }
    }
}

/// Relay to viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    MessageProduced { speaker: String, text: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Internal(format!("encode failed: {}", e)))
    }
}

impl From<ChatEvent> for ServerMessage {
    fn from(event: ChatEvent) -> Self {
        ServerMessage::MessageProduced {
            speaker: event.speaker,
            text: event.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_triggers() {
        assert_eq!(ClientMessage::parse(r#"{"type":"start"}"#).unwrap(), ClientMessage::Start);
        assert_eq!(ClientMessage::parse(r#"{"type":"advance"}"#).unwrap(), ClientMessage::Advance);
        assert_eq!(ClientMessage::parse(r#"{"type":"next"}"#).unwrap(), ClientMessage::Advance);
    }

    #[test]
    fn test_parse_bare_words() {
        assert_eq!(ClientMessage::parse("start\n").unwrap(), ClientMessage::Start);
        assert_eq!(ClientMessage::parse("next").unwrap(), ClientMessage::Advance);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = ClientMessage::parse(r#"{"type":"rewind"}"#).unwrap_err();
        assert!(matches!(err, Error::ProtocolMalformed { .. }));
        assert!(ClientMessage::parse("hello").is_err());
    }

    #[test]
    fn test_message_produced_shape() {
        let msg = ServerMessage::from(ChatEvent::new("GPT-4", "Hi."));
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "message-produced");
        assert_eq!(json["speaker"], "GPT-4");
        assert_eq!(json["text"], "Hi.");
    }
}
