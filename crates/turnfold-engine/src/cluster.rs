use serde::{Deserialize, Serialize};
use turnfold_types::{BlockKind, ContentBlock, Role, TokenUsage, Turn};

use crate::strategy::AbsorptionStrategy;

/// One logical interaction round: a (possibly merged) user turn paired with
/// a (possibly merged) assistant turn plus any absorbed tool-result turns.
///
/// Clusters own copies of their merged content; they share no state with the
/// source turns. A build pass produces the whole list at once; loading a new
/// trace means building again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnCluster {
    /// 0-based position, always equal to the cluster's index in the output
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_turn: Option<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_turn: Option<Turn>,
    /// Original position of the first turn merged into the user side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_turn_index: Option<usize>,
    /// Original position of the first turn merged into the assistant side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_turn_index: Option<usize>,
    /// UI expand/collapse state, carried as plain data
    #[serde(default)]
    pub expanded: bool,
    pub thinking_count: usize,
    pub tool_count: usize,
    pub document_count: usize,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

/// Group the ordered turn sequence into interaction-round clusters.
///
/// Single forward pass. Consecutive user turns merge into one user side;
/// the assistant side collects consecutive assistant turns plus every turn
/// the strategy absorbs (tool-result rounds), repeated until a genuine user
/// turn opens the next cluster. Turns with foreign roles are skipped, as is
/// an absorbable turn arriving before any round exists. Never fails.
pub fn build_clusters(turns: &[Turn], strategy: &dyn AbsorptionStrategy) -> Vec<TurnCluster> {
    let mut clusters: Vec<TurnCluster> = Vec::new();
    let mut current: Option<ClusterAccumulator> = None;

    for (i, turn) in turns.iter().enumerate() {
        if turn.role == Role::Unknown {
            continue;
        }

        if strategy.should_absorb_into_previous(turn) {
            // System-emitted tool output: fold into the round in progress.
            // With no round open there is nothing to attach it to.
            if let Some(acc) = current.as_mut() {
                acc.push_assistant(i, turn);
            }
            continue;
        }

        match turn.role {
            Role::User => {
                // A genuine user turn extends the user side only while the
                // round has no assistant content yet; otherwise it opens the
                // next round.
                match current.take() {
                    Some(mut acc) if acc.assistant.is_empty() => {
                        acc.push_user(i, turn);
                        current = Some(acc);
                    }
                    finished => {
                        if let Some(acc) = finished {
                            clusters.push(acc.finish(clusters.len()));
                        }
                        let mut acc = ClusterAccumulator::new();
                        acc.push_user(i, turn);
                        current = Some(acc);
                    }
                }
            }
            Role::Assistant => {
                // Orphan assistant runs (no preceding user turn) still form
                // a cluster, just without a user side.
                current
                    .get_or_insert_with(ClusterAccumulator::new)
                    .push_assistant(i, turn);
            }
            Role::Unknown => unreachable!("skipped above"),
        }
    }

    if let Some(acc) = current.take() {
        clusters.push(acc.finish(clusters.len()));
    }

    clusters
}

/// Mutable state for the cluster under construction
struct ClusterAccumulator {
    user: MergedSide,
    assistant: MergedSide,
}

impl ClusterAccumulator {
    fn new() -> Self {
        ClusterAccumulator {
            user: MergedSide::new(),
            assistant: MergedSide::new(),
        }
    }

    fn push_user(&mut self, index: usize, turn: &Turn) {
        self.user.push(index, turn);
    }

    fn push_assistant(&mut self, index: usize, turn: &Turn) {
        self.assistant.push(index, turn);
    }

    fn finish(self, index: usize) -> TurnCluster {
        // Enrichment reads the sides before they are consumed into turns
        let is_sidechain = self.user.is_sidechain || self.assistant.is_sidechain;
        let agent_id = self
            .assistant
            .agent_id
            .clone()
            .or_else(|| self.user.agent_id.clone());
        let has_error = self.assistant.error.is_some() || self.assistant.is_api_error_message;
        let stop_reason = self.assistant.stop_reason.clone();

        let mut thinking_count = 0;
        let mut tool_count = 0;
        let mut document_count = 0;
        for block in &self.assistant.content {
            match block.kind() {
                BlockKind::Thinking => thinking_count += 1,
                BlockKind::ToolUse => tool_count += 1,
                BlockKind::Image | BlockKind::Document => document_count += 1,
                _ => {}
            }
        }
        document_count += self
            .user
            .content
            .iter()
            .filter(|b| b.is_attachment())
            .count();

        let (user_turn, user_turn_index) = self.user.into_turn(Role::User);
        let (assistant_turn, assistant_turn_index) = self.assistant.into_turn(Role::Assistant);

        TurnCluster {
            index,
            user_turn,
            assistant_turn,
            user_turn_index,
            assistant_turn_index,
            expanded: false,
            thinking_count,
            tool_count,
            document_count,
            is_sidechain,
            agent_id,
            has_error,
            stop_reason,
        }
    }
}

/// Accumulates one side (user or assistant) of a cluster across the turns
/// merged into it.
///
/// Merge rules: `id`, `agent_id`, and `error` keep the first value seen;
/// `stop_reason` keeps the last (the round's final stop state); boolean
/// flags OR; `usage` sums field-wise; content concatenates in order.
struct MergedSide {
    turn_index: Option<usize>,
    id: Option<String>,
    content: Vec<ContentBlock>,
    is_sidechain: bool,
    agent_id: Option<String>,
    stop_reason: Option<String>,
    error: Option<String>,
    is_api_error_message: bool,
    usage: Option<TokenUsage>,
}

impl MergedSide {
    fn new() -> Self {
        MergedSide {
            turn_index: None,
            id: None,
            content: Vec::new(),
            is_sidechain: false,
            agent_id: None,
            stop_reason: None,
            error: None,
            is_api_error_message: false,
            usage: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.turn_index.is_none()
    }

    fn push(&mut self, index: usize, turn: &Turn) {
        if self.turn_index.is_none() {
            self.turn_index = Some(index);
        }
        if self.id.is_none() {
            self.id = Some(turn.id.clone());
        }
        self.content.extend(turn.content.iter().cloned());
        self.is_sidechain |= turn.is_sidechain;
        if self.agent_id.is_none() {
            self.agent_id = turn.agent_id.clone();
        }
        if turn.stop_reason.is_some() {
            self.stop_reason = turn.stop_reason.clone();
        }
        if self.error.is_none() {
            self.error = turn.error.clone();
        }
        self.is_api_error_message |= turn.is_api_error_message;
        if let Some(usage) = &turn.usage {
            self.usage = Some(match &self.usage {
                Some(merged) => merged.add(usage),
                None => *usage,
            });
        }
    }

    fn into_turn(self, role: Role) -> (Option<Turn>, Option<usize>) {
        let Some(index) = self.turn_index else {
            return (None, None);
        };

        let turn = Turn {
            id: self.id.unwrap_or_default(),
            role,
            content: self.content,
            is_sidechain: self.is_sidechain,
            agent_id: self.agent_id,
            stop_reason: self.stop_reason,
            error: self.error,
            is_api_error_message: self.is_api_error_message,
            usage: self.usage,
        };
        (Some(turn), Some(index))
    }
}
