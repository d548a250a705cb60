// Engine crate - cluster construction, timing correlation, and the derived
// projections. Sits between parsed turns (turnfold-types) and presentation.
//
// Every entry point is a pure synchronous function over immutable input;
// rebuilding for a new trace means calling the same functions again.

pub mod cluster;
pub mod metrics;
pub mod searchable;
pub mod strategy;
pub mod summary;

pub use cluster::{TurnCluster, build_clusters};
pub use metrics::{ClusterMetrics, calculate_cluster_metrics};
pub use searchable::{
    DocumentMeta, SearchableCluster, SourceKind, ThinkingBlock, ToolResultEntry, ToolUseEntry,
    extract_searchable_content,
};
pub use strategy::{
    AbsorptionStrategy, ClaudeCodeStrategy, ClusterTimingData, StrategyRegistry, ThinkingTiming,
};
pub use summary::{ClusterSequenceSummary, summarize_clusters};
