use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use timewarp_replay::{Modification, ReplayMode, ReplayResult};
use timewarp_types::ExecutionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Options a caller supplies when creating a branch.
#[derive(Debug, Clone, Default)]
pub struct BranchOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub modification: Option<Modification>,
    /// Replay mode to use at execution time; defaults to `hybrid`.
    pub mode: Option<ReplayMode>,
}

/// A hypothetical fork from a parent execution (or parent branch) at a given
/// sequence, with the replay result it produced once executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_execution_id: String,
    pub parent_branch_id: Option<String>,
    pub branch_point_sequence: u64,
    pub modification: Option<Modification>,
    pub mode: Option<ReplayMode>,
    pub status: BranchStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<ReplayResult>,
    pub comparison: Option<BranchComparison>,
    pub error: Option<String>,
    /// The branch's own replayed log, loaded back from the store once
    /// `execute_branch` successfully persists/replays it, when available.
    #[serde(skip)]
    pub materialized_timeline: Option<Vec<ExecutionSnapshot>>,
}

/// One sequence's difference between two timelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequenceDiff {
    Added,
    Removed,
    Changed { fields: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDiffEntry {
    pub sequence: u64,
    pub diff: SequenceDiff,
}

/// Result of comparing a branch against another branch or its parent
/// execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchComparison {
    pub label_a: String,
    pub label_b: String,
    /// `b`'s total step duration minus `a`'s, in milliseconds.
    pub duration_delta_ms: i64,
    /// `b`'s step count minus `a`'s.
    pub step_count_delta: i64,
    pub a_success: bool,
    pub b_success: bool,
    pub sequence_diff: Option<Vec<SequenceDiffEntry>>,
}

/// One node of a branch tree, linked by `parent_branch_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchTreeNode {
    pub branch: Branch,
    pub children: Vec<BranchTreeNode>,
}
