use serde::{Deserialize, Serialize};
use serde_json::Value;
use turnfold_types::{ContentBlock, Entry};

use crate::cluster::TurnCluster;
use crate::strategy::{AbsorptionStrategy, ClusterTimingData};

/// Flattened, timing-annotated projection of one cluster, ready for search
/// and display. Derived from the cluster but decoupled from its turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableCluster {
    pub cluster_index: usize,
    pub user_text: String,
    pub assistant_text: String,
    pub thinking_blocks: Vec<ThinkingBlock>,
    pub tool_uses: Vec<ToolUseEntry>,
    pub tool_results: Vec<ToolResultEntry>,
    pub documents: Vec<DocumentMeta>,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingBlock {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseEntry {
    pub name: String,
    /// Pretty-printed call arguments
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultEntry {
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Where an attachment's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Url,
    File,
    Base64,
    Unknown,
}

/// Display metadata for an image/document attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub source_kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The url, file id, or inline data backing the attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Project clusters into their searchable form, order-preserving, one output
/// per input cluster.
///
/// Tool durations pair `tool_use`/`tool_result` timestamps by id. Thinking
/// durations come from the strategy's pre-extracted sequence, matched by
/// exact text equality against a cursor that advances only on a match; a
/// mismatched block simply carries no duration. Duplicate texts therefore
/// pair in log order.
pub fn extract_searchable_content(
    clusters: &[TurnCluster],
    entries: Option<&[Entry]>,
    strategy: &dyn AbsorptionStrategy,
) -> Vec<SearchableCluster> {
    let timing = entries
        .map(|e| strategy.extract_timing_data(e))
        .unwrap_or_default();

    let mut thinking_cursor = 0;
    clusters
        .iter()
        .map(|cluster| project_cluster(cluster, &timing, &mut thinking_cursor))
        .collect()
}

fn project_cluster(
    cluster: &TurnCluster,
    timing: &ClusterTimingData,
    thinking_cursor: &mut usize,
) -> SearchableCluster {
    let user_text = cluster
        .user_turn
        .as_ref()
        .map(|turn| turn.joined_text())
        .unwrap_or_default();

    let mut documents = Vec::new();
    if let Some(turn) = &cluster.user_turn {
        for block in &turn.content {
            match block {
                ContentBlock::Image { source } => {
                    documents.push(document_from_source(source, None));
                }
                ContentBlock::Document { source, title } => {
                    documents.push(document_from_source(source, title.clone()));
                }
                _ => {}
            }
        }
    }

    let mut assistant_text_parts: Vec<&str> = Vec::new();
    let mut thinking_blocks = Vec::new();
    let mut tool_uses = Vec::new();
    let mut tool_results = Vec::new();

    if let Some(turn) = &cluster.assistant_turn {
        for block in &turn.content {
            match block {
                ContentBlock::Text { text } => assistant_text_parts.push(text),
                ContentBlock::Thinking { thinking } => {
                    let duration_ms = match timing.thinking_timings.get(*thinking_cursor) {
                        Some(t) if t.text == *thinking => {
                            *thinking_cursor += 1;
                            t.duration_ms
                        }
                        _ => None,
                    };
                    thinking_blocks.push(ThinkingBlock {
                        text: thinking.clone(),
                        duration_ms,
                    });
                }
                ContentBlock::ToolUse { id, name, input } => {
                    tool_uses.push(ToolUseEntry {
                        name: name.clone(),
                        input: pretty_input(input),
                        id: Some(id.clone()),
                    });
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    tool_results.push(ToolResultEntry {
                        content: stringify_result(content),
                        is_error: *is_error,
                        duration_ms: tool_duration(timing, tool_use_id),
                    });
                }
                ContentBlock::Image { source } => {
                    documents.push(document_from_source(source, None));
                }
                ContentBlock::Document { source, title } => {
                    documents.push(document_from_source(source, title.clone()));
                }
            }
        }
    }

    SearchableCluster {
        cluster_index: cluster.index,
        user_text,
        assistant_text: assistant_text_parts.join("\n"),
        thinking_blocks,
        tool_uses,
        tool_results,
        documents,
        is_sidechain: cluster.is_sidechain,
        agent_id: cluster.agent_id.clone(),
        has_error: cluster.has_error,
        stop_reason: cluster.stop_reason.clone(),
        error: cluster
            .assistant_turn
            .as_ref()
            .and_then(|t| t.error.clone()),
    }
}

fn tool_duration(timing: &ClusterTimingData, tool_use_id: &str) -> Option<i64> {
    let start = timing.tool_use_timestamps.get(tool_use_id)?;
    let end = timing.tool_result_timestamps.get(tool_use_id)?;
    let duration = end - start;
    (duration > 0).then_some(duration)
}

fn pretty_input(input: &Value) -> String {
    serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string())
}

/// Reduce structured tool output to display text: strings pass through,
/// arrays of text blocks join with newlines, anything else stays JSON.
fn stringify_result(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let texts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                content.to_string()
            } else {
                texts.join("\n")
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn document_from_source(source: &Value, title: Option<String>) -> DocumentMeta {
    let media_type = source
        .get("media_type")
        .and_then(Value::as_str)
        .map(str::to_string);

    let (source_kind, reference, size_bytes) = match source.get("type").and_then(Value::as_str) {
        Some("url") => (
            SourceKind::Url,
            source.get("url").and_then(Value::as_str).map(str::to_string),
            None,
        ),
        Some("file") => (
            SourceKind::File,
            source
                .get("file_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            None,
        ),
        Some("base64") => {
            let data = source.get("data").and_then(Value::as_str);
            (
                SourceKind::Base64,
                data.map(str::to_string),
                data.map(str::len),
            )
        }
        _ => (SourceKind::Unknown, None, None),
    };

    DocumentMeta {
        media_type,
        source_kind,
        size_bytes,
        title,
        reference,
    }
}
