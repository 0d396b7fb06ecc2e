//! Wire protocol spoken over the AI CLI's stdin/stdout: one JSON object per
//! line, discriminated by a `type` tag.

use crate::ContentBlock;
use serde::{Deserialize, Serialize};

/// One event parsed from a line of the AI CLI's stdout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiEvent {
    System(serde_json::Value),
    Assistant { message: Message },
    User { message: Message },
    Result {
        subtype: ResultSubtype,
        is_error: bool,
        session_id: Option<String>,
        total_cost_usd: Option<f64>,
        duration_ms: Option<u64>,
    },
}

/// The `message` payload of an `assistant`/`user` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    #[serde(default)]
    pub role: Option<String>,
    pub content: Vec<ContentBlock>,
}

/// Terminal-result subtype. `Other` absorbs subtypes this wrapper doesn't
/// need to special-case (the AI CLI's schema is allowed to grow new ones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResultSubtype {
    Success,
    ErrorMaxTurns,
    Other(String),
}

impl<'de> Deserialize<'de> for ResultSubtype {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "success" => ResultSubtype::Success,
            "error_max_turns" => ResultSubtype::ErrorMaxTurns,
            other => ResultSubtype::Other(other.to_string()),
        })
    }
}

impl AiEvent {
    /// Parse one line of stdout. Malformed lines are the caller's concern to
    /// log and skip, per §4.1 ("malformed lines are logged and skipped").
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// One JSON object written to the AI CLI's stdin for a user message.
pub fn user_message_line(content: &str) -> String {
    let payload = serde_json::json!({
        "type": "user",
        "message": { "role": "user", "content": content },
    });
    payload.to_string()
}

/// One JSON object written to the AI CLI's stdin for a tool result.
pub fn tool_result_line(tool_use_id: &str, content: &serde_json::Value) -> String {
    let payload = serde_json::json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": content,
            }],
        },
    });
    payload.to_string()
}

/// Substrings in child stderr that indicate a permanent, non-retryable
/// failure (§4.1 "Permanent failure detection").
pub const PERMANENT_FAILURE_MARKERS: &[&str] = &[
    "authentication required",
    "invalid api key",
    "version incompatible",
];

pub fn is_permanent_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    PERMANENT_FAILURE_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result_event() {
        let line = r#"{"type":"result","subtype":"success","is_error":false,"session_id":"abc","total_cost_usd":0.01,"duration_ms":120}"#;
        let event = AiEvent::parse_line(line).unwrap();
        match event {
            AiEvent::Result { subtype, is_error, .. } => {
                assert_eq!(subtype, ResultSubtype::Success);
                assert!(!is_error);
            }
            _ => panic!("expected Result event"),
        }
    }

    #[test]
    fn parses_assistant_text_block() {
        let line = r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"hi"}]}}"#;
        let event = AiEvent::parse_line(line).unwrap();
        match event {
            AiEvent::Assistant { message } => assert_eq!(message.content.len(), 1),
            _ => panic!("expected Assistant event"),
        }
    }

    #[test]
    fn malformed_line_errors_without_panicking() {
        assert!(AiEvent::parse_line("not json").is_err());
    }

    #[test]
    fn detects_permanent_failure_markers() {
        assert!(is_permanent_failure("Error: Authentication Required"));
        assert!(is_permanent_failure("invalid API key provided"));
        assert!(!is_permanent_failure("connection reset, retrying"));
    }

    #[test]
    fn unknown_result_subtype_is_preserved() {
        let line = r#"{"type":"result","subtype":"mystery","is_error":true,"session_id":null,"total_cost_usd":null,"duration_ms":null}"#;
        let event = AiEvent::parse_line(line).unwrap();
        match event {
            AiEvent::Result { subtype, .. } => {
                assert_eq!(subtype, ResultSubtype::Other("mystery".into()))
            }
            _ => panic!("expected Result event"),
        }
    }
}
