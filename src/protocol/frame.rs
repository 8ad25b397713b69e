//! Frame classification

use serde_json::Value;

use super::types::ToolEvent;

/// Payload that terminates the stream successfully
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded stream frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Termination sentinel
    Done,
    /// Discriminated tool or thinking frame
    Tool(ToolEvent),
    /// Answer text to append
    Content(String),
    /// Well-formed JSON with nothing for us
    Ignored,
}

impl Frame {
    /// Classify a frame payload
    ///
    /// Returns `None` when the payload is neither the sentinel nor a JSON object.
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Some(Self::Done);
        }

        let Value::Object(mut object) = serde_json::from_str::<Value>(payload).ok()? else {
            return None;
        };

        let tool = |object: &serde_json::Map<String, Value>| {
            object
                .get("tool")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };

        let kind = object.get("type").and_then(Value::as_str).map(str::to_owned);
        let event = match kind.as_deref() {
            Some("tool_call") => Some(ToolEvent::Call {
                tool: tool(&object),
                params: object.remove("params").unwrap_or(Value::Null),
            }),
            Some("tool_result") => Some(ToolEvent::Result {
                tool: tool(&object),
                result: object.remove("result").unwrap_or(Value::Null),
            }),
            Some("final_response") => Some(ToolEvent::Final),
            Some("internal_thinking") => Some(ToolEvent::Thinking {
                text: object
                    .get("text")
                    .or_else(|| object.get("content"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            _ => None,
        };

        if let Some(event) = event {
            return Some(Self::Tool(event));
        }

        match object.remove("content") {
            Some(Value::String(text)) => Some(Self::Content(text)),
            _ => Some(Self::Ignored),
        }
    }
}
