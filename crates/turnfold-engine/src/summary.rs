use serde::{Deserialize, Serialize};

use crate::cluster::TurnCluster;
use crate::metrics::calculate_cluster_metrics;

/// Sequence-level rollup across all clusters of one trace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSequenceSummary {
    pub cluster_counts: ClusterCounts,
    pub block_counts: BlockCounts,
    pub token_stats: TokenStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCounts {
    pub total: usize,
    pub with_user_turn: usize,
    pub sidechain: usize,
    pub with_errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCounts {
    pub thinking: usize,
    pub tool: usize,
    pub document: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub total: u64,
    pub input: u64,
    pub output: u64,
}

/// Summarize a cluster sequence. Token figures reuse the per-cluster metrics
/// so the rollup always agrees with what charting displays.
pub fn summarize_clusters(clusters: &[TurnCluster]) -> ClusterSequenceSummary {
    let metrics = calculate_cluster_metrics(clusters);

    let mut input = 0u64;
    let mut output = 0u64;
    for m in &metrics {
        input += m.input_tokens;
        output += m.output_tokens;
    }

    let mut thinking = 0;
    let mut tool = 0;
    let mut document = 0;
    let mut with_user_turn = 0;
    let mut sidechain = 0;
    let mut with_errors = 0;
    for cluster in clusters {
        thinking += cluster.thinking_count;
        tool += cluster.tool_count;
        document += cluster.document_count;
        if cluster.user_turn.is_some() {
            with_user_turn += 1;
        }
        if cluster.is_sidechain {
            sidechain += 1;
        }
        if cluster.has_error {
            with_errors += 1;
        }
    }

    ClusterSequenceSummary {
        cluster_counts: ClusterCounts {
            total: clusters.len(),
            with_user_turn,
            sidechain,
            with_errors,
        },
        block_counts: BlockCounts {
            thinking,
            tool,
            document,
        },
        token_stats: TokenStats {
            total: input + output,
            input,
            output,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::build_clusters;
    use crate::strategy::ClaudeCodeStrategy;
    use turnfold_types::{ContentBlock, Role, TokenUsage, Turn};

    fn turn(id: &str, role: Role, content: Vec<ContentBlock>) -> Turn {
        Turn {
            id: id.to_string(),
            role,
            content,
            is_sidechain: false,
            agent_id: None,
            stop_reason: None,
            error: None,
            is_api_error_message: false,
            usage: None,
        }
    }

    fn text(s: &str) -> ContentBlock {
        ContentBlock::Text {
            text: s.to_string(),
        }
    }

    #[test]
    fn test_empty_sequence() {
        let summary = summarize_clusters(&[]);
        assert_eq!(summary.cluster_counts.total, 0);
        assert_eq!(summary.token_stats.total, 0);
    }

    #[test]
    fn test_rollup_matches_per_cluster_metrics() {
        let mut a1 = turn(
            "a1",
            Role::Assistant,
            vec![
                ContentBlock::Thinking {
                    thinking: "hm".to_string(),
                },
                text("one"),
            ],
        );
        a1.usage = Some(TokenUsage {
            input_tokens: 0,
            output_tokens: 10,
            cache_read_input_tokens: 5,
            cache_creation_input_tokens: 0,
        });
        let mut a2 = turn("a2", Role::Assistant, vec![text("two")]);
        a2.usage = Some(TokenUsage {
            input_tokens: 0,
            output_tokens: 20,
            cache_read_input_tokens: 0,
            cache_creation_input_tokens: 15,
        });
        a2.error = Some("failed".to_string());

        let turns = vec![
            turn("u1", Role::User, vec![text("first")]),
            a1,
            turn("u2", Role::User, vec![text("second")]),
            a2,
        ];

        let clusters = build_clusters(&turns, &ClaudeCodeStrategy);
        let summary = summarize_clusters(&clusters);

        assert_eq!(summary.cluster_counts.total, 2);
        assert_eq!(summary.cluster_counts.with_user_turn, 2);
        assert_eq!(summary.cluster_counts.with_errors, 1);
        assert_eq!(summary.block_counts.thinking, 1);

        let metrics = calculate_cluster_metrics(&clusters);
        let expected_input: u64 = metrics.iter().map(|m| m.input_tokens).sum();
        let expected_output: u64 = metrics.iter().map(|m| m.output_tokens).sum();
        assert_eq!(summary.token_stats.input, expected_input);
        assert_eq!(summary.token_stats.output, expected_output);
        assert_eq!(summary.token_stats.total, expected_input + expected_output);
        assert_eq!(summary.token_stats.input, 20);
        assert_eq!(summary.token_stats.output, 30);
    }
}
