use std::collections::HashMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use turnfold_types::{ContentBlock, Entry, Role, Turn};

/// Timing data correlated from the raw entry log. Scoped to one build pass
/// and discarded after the searchable projection is extracted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterTimingData {
    /// tool_use id -> epoch ms of the assistant entry that issued the call
    pub tool_use_timestamps: HashMap<String, i64>,
    /// tool_use id -> epoch ms of the user entry that carried the result
    pub tool_result_timestamps: HashMap<String, i64>,
    /// thinking blocks in log order, each with the time until the next entry
    pub thinking_timings: Vec<ThinkingTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingTiming {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Per-source policy: which turns fold into the round in progress, and how
/// tool/thinking timing is derived from the raw entry log.
///
/// Sources log differently (some interleave tool output under the user role,
/// some carry timing elsewhere), so both questions are answered behind one
/// capability-set trait rather than baked into the builder.
pub trait AbsorptionStrategy: Send + Sync {
    /// Unique source ID (e.g. "claude_code")
    fn id(&self) -> &'static str;

    /// Should this turn be folded into the previous cluster instead of
    /// starting a new one?
    fn should_absorb_into_previous(&self, turn: &Turn) -> bool;

    /// Correlate tool and thinking timing from the chronological entry log.
    /// Entries without a parsable timestamp contribute nothing; the walk
    /// never fails.
    fn extract_timing_data(&self, entries: &[Entry]) -> ClusterTimingData;
}

/// Built-in strategy for Claude Code-style session logs.
///
/// Tool outputs come back as user-role turns whose content is entirely
/// `tool_result` blocks. Those are system-emitted, not genuine user input,
/// and fold into the round in progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeCodeStrategy;

impl AbsorptionStrategy for ClaudeCodeStrategy {
    fn id(&self) -> &'static str {
        "claude_code"
    }

    fn should_absorb_into_previous(&self, turn: &Turn) -> bool {
        turn.role == Role::User
            && !turn.content.is_empty()
            && turn.content.iter().all(ContentBlock::is_tool_result)
    }

    fn extract_timing_data(&self, entries: &[Entry]) -> ClusterTimingData {
        let mut timing = ClusterTimingData::default();

        for (i, entry) in entries.iter().enumerate() {
            let Some(ts) = entry_epoch_ms(entry) else {
                continue;
            };

            if let Some(message) = &entry.assistant_message {
                for block in &message.content {
                    match block {
                        ContentBlock::ToolUse { id, .. } => {
                            timing.tool_use_timestamps.insert(id.clone(), ts);
                        }
                        ContentBlock::Thinking { thinking } => {
                            // Thinking spans from its own entry to the next
                            // timestamped log line; only a strictly positive
                            // difference counts.
                            let duration_ms = entries
                                .get(i + 1)
                                .and_then(entry_epoch_ms)
                                .map(|next| next - ts)
                                .filter(|d| *d > 0);
                            timing.thinking_timings.push(ThinkingTiming {
                                text: thinking.clone(),
                                duration_ms,
                            });
                        }
                        _ => {}
                    }
                }
            }

            if let Some(message) = &entry.user_message {
                for block in &message.content {
                    if let ContentBlock::ToolResult { tool_use_id, .. } = block {
                        timing.tool_result_timestamps.insert(tool_use_id.clone(), ts);
                    }
                }
            }
        }

        timing
    }
}

fn entry_epoch_ms(entry: &Entry) -> Option<i64> {
    let ts = entry.timestamp.as_deref()?;
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Registry of absorption strategies keyed by source ID.
///
/// Lookup never fails: an unknown or absent source resolves to the default
/// strategy. Callers construct one registry at startup and pass resolved
/// strategies into the engine explicitly; there is no ambient global.
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Box<dyn AbsorptionStrategy>>,
    default_id: &'static str,
}

impl StrategyRegistry {
    /// Registry with `ClaudeCodeStrategy` registered as the default.
    pub fn new() -> Self {
        let mut registry = StrategyRegistry {
            strategies: HashMap::new(),
            default_id: "",
        };
        registry.set_default(Box::new(ClaudeCodeStrategy));
        registry
    }

    /// Add or overwrite a strategy under its own ID.
    pub fn register(&mut self, strategy: Box<dyn AbsorptionStrategy>) {
        self.strategies.insert(strategy.id(), strategy);
    }

    /// Replace the fallback strategy, registering it as well.
    pub fn set_default(&mut self, strategy: Box<dyn AbsorptionStrategy>) {
        self.default_id = strategy.id();
        self.register(strategy);
    }

    /// Resolve the strategy for a source, falling back to the default for
    /// unset or unregistered IDs.
    pub fn get(&self, source_id: Option<&str>) -> &dyn AbsorptionStrategy {
        source_id
            .and_then(|id| self.strategies.get(id))
            .unwrap_or_else(|| &self.strategies[self.default_id])
            .as_ref()
    }

    /// All registered source IDs, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.strategies.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
