use serde::{Deserialize, Serialize};

use crate::content::ContentBlock;

/// Message role as recorded in the log.
///
/// Roles other than user/assistant (summary records, queued commands, etc.)
/// deserialize to `Unknown` instead of failing; the cluster builder skips
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(from = "String")]
pub enum Role {
    User,
    Assistant,
    Unknown,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Unknown,
        }
    }
}

/// Token accounting attached to an assistant API response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

impl TokenUsage {
    /// Field-wise sum. Used when several log turns merge into one cluster
    /// side, so each underlying API call is counted once.
    pub fn add(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            cache_read_input_tokens: self.cache_read_input_tokens + other.cache_read_input_tokens,
            cache_creation_input_tokens: self.cache_creation_input_tokens
                + other.cache_creation_input_tokens,
        }
    }
}

/// One role-tagged message unit composed of ordered content blocks.
///
/// A "sidechain" turn originates from a sub-agent thread rather than the
/// primary conversation; `agent_id` identifies which sub-agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub is_api_error_message: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Turn {
    /// All `text` blocks joined with newlines (empty string if none)
    pub fn joined_text(&self) -> String {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        parts.join("\n")
    }
}

/// Raw per-log-line record, external to the `Turn` model.
///
/// Carries the original timestamp plus the parsed message content of the
/// line. Used only for timing correlation, never for grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(rename = "type")]
    pub entry_type: String,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<ParsedMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<ParsedMessage>,
}

/// Parsed message payload of a raw log entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_deserialization_defaults() {
        let json = r#"{
            "id": "turn-1",
            "role": "user",
            "content": [{"type": "text", "text": "Hello"}]
        }"#;
        let turn: Turn = serde_json::from_str(json).unwrap();

        assert_eq!(turn.id, "turn-1");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content.len(), 1);
        assert!(!turn.is_sidechain);
        assert!(turn.agent_id.is_none());
        assert!(turn.usage.is_none());
        assert!(!turn.is_api_error_message);
    }

    #[test]
    fn test_unknown_role_is_tolerated() {
        let json = r#"{"id": "x", "role": "summary", "content": []}"#;
        let turn: Turn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.role, Role::Unknown);
    }

    #[test]
    fn test_token_usage_add() {
        let a = TokenUsage {
            input_tokens: 10,
            output_tokens: 20,
            cache_read_input_tokens: 5,
            cache_creation_input_tokens: 1,
        };
        let b = TokenUsage {
            input_tokens: 3,
            output_tokens: 7,
            cache_read_input_tokens: 0,
            cache_creation_input_tokens: 9,
        };

        let sum = a.add(&b);
        assert_eq!(sum.input_tokens, 13);
        assert_eq!(sum.output_tokens, 27);
        assert_eq!(sum.cache_read_input_tokens, 5);
        assert_eq!(sum.cache_creation_input_tokens, 10);
    }

    #[test]
    fn test_joined_text() {
        let turn = Turn {
            id: "t".to_string(),
            role: Role::Assistant,
            content: vec![
                ContentBlock::Text {
                    text: "first".to_string(),
                },
                ContentBlock::Thinking {
                    thinking: "hmm".to_string(),
                },
                ContentBlock::Text {
                    text: "second".to_string(),
                },
            ],
            is_sidechain: false,
            agent_id: None,
            stop_reason: None,
            error: None,
            is_api_error_message: false,
            usage: None,
        };

        assert_eq!(turn.joined_text(), "first\nsecond");
    }

    #[test]
    fn test_entry_deserialization() {
        let json = r#"{
            "type": "assistant",
            "uuid": "abc-123",
            "timestamp": "2025-06-01T10:00:00.000Z",
            "assistantMessage": {
                "content": [{"type": "thinking", "thinking": "plan first"}]
            }
        }"#;
        let entry: Entry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.entry_type, "assistant");
        assert_eq!(entry.timestamp.as_deref(), Some("2025-06-01T10:00:00.000Z"));
        assert!(entry.user_message.is_none());
        assert_eq!(entry.assistant_message.unwrap().content.len(), 1);
    }
}
