use std::time::Duration;

use serde::{Deserialize, Serialize};
use timewarp_types::{CheckpointKind, Value};

/// Execution strategy for a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Every step's output is the recorded output; no external calls.
    Simulate,
    /// Every tool/LLM step routes through the injected executor, falling
    /// back to the recorded output if none is registered for that kind.
    Execute,
    /// A step is executed only if it matches the replay's modification;
    /// everything else is simulated.
    Hybrid,
}

/// What changed about a single step, relative to the kind of checkpoint it
/// replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Input,
    Workspace,
    ToolResponse,
    LlmResponse,
}

/// A targeted change applied to one replayed step's inputs. Never rewrites
/// the recorded log it replays over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modification {
    pub modification_type: ModificationType,
    pub path: String,
    pub value: Value,
}

impl Modification {
    pub fn new(modification_type: ModificationType, path: impl Into<String>, value: Value) -> Self {
        Self {
            modification_type,
            path: path.into(),
            value,
        }
    }

    /// A step is "modified" when its checkpoint kind belongs to the category
    /// this modification targets.
    pub fn applies_to(&self, kind: CheckpointKind) -> bool {
        match self.modification_type {
            ModificationType::Input => true,
            ModificationType::Workspace => kind == CheckpointKind::WorkspaceUpdate,
            ModificationType::ToolResponse => kind.is_tool_call(),
            ModificationType::LlmResponse => kind.is_llm_call(),
        }
    }
}

/// Options controlling a single `replay_from` call.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub mode: ReplayMode,
    pub modification: Option<Modification>,
    pub max_steps: Option<u64>,
    pub stop_at_sequence: Option<u64>,
    pub stop_at_checkpoint: Option<CheckpointKind>,
    pub timeout: Option<Duration>,
    pub compare_with_original: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Simulate,
            modification: None,
            max_steps: None,
            stop_at_sequence: None,
            stop_at_checkpoint: None,
            timeout: None,
            compare_with_original: false,
        }
    }
}

/// Why a replay stopped walking the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Ran off the end of the timeline; nothing left to replay.
    EndOfTimeline,
    Timeout,
    MaxSteps,
    Sequence,
    Checkpoint,
    Error,
}

/// A single field difference between a step's recorded and replayed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDifference {
    pub sequence: u64,
    pub path: String,
    pub original: Option<Value>,
    pub replayed: Option<Value>,
    pub diff_type: String,
}

/// Record of one replayed snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayStep {
    pub sequence: u64,
    pub checkpoint_type: CheckpointKind,
    pub input: Option<Value>,
    pub output: Option<Value>,
    /// Wall-clock duration of this step's execution, in milliseconds.
    pub duration_ms: i64,
    pub simulated: bool,
    pub modified: bool,
    pub error: Option<String>,
}

/// Outcome of one `replay_from` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Fresh identity correlating this replay with the branching engine.
    pub replay_execution_id: String,
    pub source_execution_id: String,
    pub start_sequence: u64,
    pub mode: ReplayMode,
    pub steps: Vec<ReplayStep>,
    pub differences: Vec<StateDifference>,
    pub tool_calls: u64,
    pub llm_calls: u64,
    pub stop_reason: StopReason,
    pub success: bool,
}

impl ReplayResult {
    pub fn steps_replayed(&self) -> usize {
        self.steps.len()
    }
}
