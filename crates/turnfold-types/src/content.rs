use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One typed unit of message content, as emitted by the upstream log parser.
///
/// The wire shape follows the assistant API: the discriminator is `type` and
/// variant fields keep their log names. Tool inputs, tool outputs, and
/// attachment sources stay as raw JSON; the engine never interprets them
/// beyond what its projections need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
    Image {
        source: Value,
    },
    Document {
        source: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

impl ContentBlock {
    /// Classify the block regardless of variant payload
    pub fn kind(&self) -> BlockKind {
        match self {
            ContentBlock::Text { .. } => BlockKind::Text,
            ContentBlock::Thinking { .. } => BlockKind::Thinking,
            ContentBlock::ToolUse { .. } => BlockKind::ToolUse,
            ContentBlock::ToolResult { .. } => BlockKind::ToolResult,
            ContentBlock::Image { .. } => BlockKind::Image,
            ContentBlock::Document { .. } => BlockKind::Document,
        }
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, ContentBlock::ToolResult { .. })
    }

    /// True for image/document attachments on either side of a conversation
    pub fn is_attachment(&self) -> bool {
        matches!(
            self,
            ContentBlock::Image { .. } | ContentBlock::Document { .. }
        )
    }
}

/// Block classification used by counters and projections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Thinking,
    ToolUse,
    ToolResult,
    Image,
    Document,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_serialization_roundtrip() {
        let block = ContentBlock::ToolUse {
            id: "toolu_01".to_string(),
            name: "Read".to_string(),
            input: serde_json::json!({"file_path": "/tmp/a.rs"}),
        };

        let json = serde_json::to_string(&block).unwrap();
        let deserialized: ContentBlock = serde_json::from_str(&json).unwrap();

        assert_eq!(block, deserialized);
        assert!(json.contains("\"type\":\"tool_use\""));
    }

    #[test]
    fn test_tool_result_defaults() {
        let json = r#"{"type":"tool_result","tool_use_id":"toolu_01"}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();

        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "toolu_01");
                assert!(content.is_null());
                assert!(!is_error);
            }
            _ => panic!("Expected ToolResult variant"),
        }
    }

    #[test]
    fn test_block_kind() {
        let text = ContentBlock::Text {
            text: "hi".to_string(),
        };
        assert_eq!(text.kind(), BlockKind::Text);
        assert!(!text.is_tool_result());
        assert!(!text.is_attachment());

        let image = ContentBlock::Image {
            source: serde_json::json!({"type": "url", "url": "https://example.com/a.png"}),
        };
        assert_eq!(image.kind(), BlockKind::Image);
        assert!(image.is_attachment());

        let result = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".to_string(),
            content: serde_json::Value::Null,
            is_error: false,
        };
        assert!(result.is_tool_result());
    }
}
