//! Chat turns, tool events and the request wire shape

use serde::{Deserialize, Serialize};

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation
///
/// Provisional turns exist only while an exchange is in flight and are never
/// sent back to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub is_provisional: bool,
}

impl ChatTurn {
    /// A persisted user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_provisional: false,
        }
    }

    /// A persisted assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_provisional: false,
        }
    }

    /// An in-flight assistant turn
    #[must_use]
    pub fn provisional(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_provisional: true,
        }
    }
}

/// Tool lifecycle event decoded from the stream
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    /// Backend started a tool invocation
    Call {
        tool: String,
        params: serde_json::Value,
    },
    /// Backend received a tool's result
    Result {
        tool: String,
        result: serde_json::Value,
    },
    /// Exchange switched to plain answer text; no further tool events follow
    Final,
    /// Intermediate reasoning text, never part of the answer
    Thinking { text: String },
}

impl ToolEvent {
    /// Short label for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Result { .. } => "result",
            Self::Final => "final",
            Self::Thinking { .. } => "thinking",
        }
    }
}

/// Message as sent on the wire
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for one exchange
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub provider: String,
    pub enable_tools: bool,
    pub thinking: bool,
    pub temperature: f32,
    pub caching: bool,
    pub tokens_limit: u32,
    pub verbose_level: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case() {
        let request = ChatRequest {
            model: "llama3".to_string(),
            messages: vec![WireMessage {
                role: Role::User,
                content: "hi".to_string(),
            }],
            provider: "ollama".to_string(),
            enable_tools: true,
            thinking: false,
            temperature: 0.1,
            caching: true,
            tokens_limit: 1536,
            verbose_level: 1,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["enableTools"], true);
        assert_eq!(json["tokensLimit"], 1536);
        assert_eq!(json["verboseLevel"], 1);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
