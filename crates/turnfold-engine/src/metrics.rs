use serde::{Deserialize, Serialize};
use turnfold_types::ContentBlock;

use crate::cluster::TurnCluster;

/// Per-cluster token and content-length rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetrics {
    pub index: usize,
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub thinking_count: usize,
    pub tool_count: usize,
    pub content_length: usize,
}

/// Pure reduction over clusters, order-preserving, one entry per cluster.
pub fn calculate_cluster_metrics(clusters: &[TurnCluster]) -> Vec<ClusterMetrics> {
    clusters.iter().map(metrics_for).collect()
}

fn metrics_for(cluster: &TurnCluster) -> ClusterMetrics {
    let user_usage = cluster.user_turn.as_ref().and_then(|t| t.usage.as_ref());
    let assistant_usage = cluster
        .assistant_turn
        .as_ref()
        .and_then(|t| t.usage.as_ref());

    // Cache read/creation tokens count toward input, not output
    let input_tokens = user_usage.map_or(0, |u| u.input_tokens)
        + assistant_usage.map_or(0, |u| {
            u.cache_read_input_tokens + u.cache_creation_input_tokens
        });
    let output_tokens = assistant_usage.map_or(0, |u| u.output_tokens);

    let mut content_length = 0;
    if let Some(turn) = &cluster.user_turn {
        for block in &turn.content {
            if let ContentBlock::Text { text } = block {
                content_length += text.chars().count();
            }
        }
    }
    if let Some(turn) = &cluster.assistant_turn {
        for block in &turn.content {
            match block {
                ContentBlock::Text { text } => content_length += text.chars().count(),
                ContentBlock::Thinking { thinking } => content_length += thinking.chars().count(),
                _ => {}
            }
        }
    }

    ClusterMetrics {
        index: cluster.index,
        total_tokens: input_tokens + output_tokens,
        input_tokens,
        output_tokens,
        thinking_count: cluster.thinking_count,
        tool_count: cluster.tool_count,
        content_length,
    }
}
