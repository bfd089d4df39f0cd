use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use timewarp_types::{
    ActionSnapshot, ErrorSnapshot, ExecutionSnapshot, SessionState, SessionStatus, TaskState,
    TaskStatus, Value, WorkspaceState,
};

use crate::timeline::Timeline;

/// Point-in-time state built from a **prefix scan ending at `sequence`**
/// the latest session/task projection, the accumulated workspace,
/// and the full history of actions and errors seen so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructedState {
    pub execution_id: String,
    pub sequence: u64,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub session: Option<SessionState>,
    pub task: Option<TaskState>,
    pub workspace: WorkspaceState,
    pub previous_actions: Vec<ActionSnapshot>,
    pub error_history: Vec<ErrorSnapshot>,
}

/// Reconstruct state as of `sequence`. Returns `None` if no snapshot in
/// `timeline` carries that sequence number.
pub fn reconstruct(timeline: &Timeline, sequence: u64) -> Option<ReconstructedState> {
    let target_index = timeline
        .snapshots()
        .iter()
        .position(|s| s.sequence_num == sequence)?;

    let prefix = &timeline.snapshots()[..=target_index];
    let target = &prefix[target_index];

    let mut session = None;
    let mut task = None;
    let mut workspace = WorkspaceState::new();
    let mut previous_actions = Vec::new();
    let mut error_history = Vec::new();

    for snap in prefix {
        if let Some(s) = &snap.session_state {
            session = Some(s.clone());
        }
        if let Some(t) = &snap.task_state {
            task = Some(t.clone());
        }
        if let Some(w) = &snap.workspace_state {
            workspace.extend(w.clone());
        }
        if let Some(a) = &snap.action {
            previous_actions.push(a.clone());
        }
        if let Some(e) = &snap.error {
            error_history.push(e.clone());
        }
    }

    Some(ReconstructedState {
        execution_id: target.execution_id.clone(),
        sequence: target.sequence_num,
        index: target_index,
        timestamp: target.timestamp,
        agent_id: target.agent_id.clone(),
        task_id: target.task_id.clone(),
        trace_id: target.trace_id.clone(),
        span_id: target.span_id.clone(),
        session,
        task,
        workspace,
        previous_actions,
        error_history,
    })
}

/// Added/removed/modified keys between two workspace snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDiff {
    pub added: HashMap<String, Value>,
    pub removed: Vec<String>,
    pub modified: HashMap<String, (Value, Value)>,
}

fn diff_workspace(a: &WorkspaceState, b: &WorkspaceState) -> WorkspaceDiff {
    let mut diff = WorkspaceDiff::default();
    for (key, value) in b {
        match a.get(key) {
            None => {
                diff.added.insert(key.clone(), value.clone());
            }
            Some(old) if old != value => {
                diff.modified.insert(key.clone(), (old.clone(), value.clone()));
            }
            _ => {}
        }
    }
    for key in a.keys() {
        if !b.contains_key(key) {
            diff.removed.push(key.clone());
        }
    }
    diff
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDiff {
    pub status_changed: Option<(SessionStatus, SessionStatus)>,
    /// Session history only grows; a shrinking delta is reported as zero.
    pub messages_added: usize,
    pub workspace_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDiff {
    pub status_changed: Option<(TaskStatus, TaskStatus)>,
    pub assignee_changed: Option<(Option<String>, Option<String>)>,
    pub output_changed: bool,
    pub error_changed: bool,
}

/// Full comparison between the reconstructed states at two sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateComparison {
    pub from_sequence: u64,
    pub to_sequence: u64,
    #[serde(with = "duration_millis")]
    pub time_delta: Duration,
    pub snapshots_between: usize,
    pub actions_between: usize,
    pub errors_between: usize,
    pub workspace_diff: WorkspaceDiff,
    pub session_diff: Option<SessionDiff>,
    pub task_diff: Option<TaskDiff>,
}

/// `chrono::Duration` has no serde impl of its own; represent it on the wire
/// as whole milliseconds.
mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.num_milliseconds().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(millis))
    }
}

/// Compare reconstructed state at `seq_a` and `seq_b`. Order doesn't matter
/// — the pair is swapped so `from <= to`. Returns `None` if either sequence
/// is missing from the timeline.
pub fn compare_states(timeline: &Timeline, seq_a: u64, seq_b: u64) -> Option<StateComparison> {
    let (from_seq, to_seq) = if seq_a <= seq_b { (seq_a, seq_b) } else { (seq_b, seq_a) };

    let from = reconstruct(timeline, from_seq)?;
    let to = reconstruct(timeline, to_seq)?;

    let between: Vec<&ExecutionSnapshot> = timeline
        .snapshots()
        .iter()
        .filter(|s| s.sequence_num > from_seq && s.sequence_num < to_seq)
        .collect();

    let actions_between = between.iter().filter(|s| s.action.is_some()).count();
    let errors_between = between.iter().filter(|s| s.has_error()).count();

    let workspace_diff = diff_workspace(&from.workspace, &to.workspace);

    let session_diff = match (&from.session, &to.session) {
        (Some(a), Some(b)) => Some(SessionDiff {
            status_changed: (a.status != b.status).then_some((a.status, b.status)),
            messages_added: b.messages.len().saturating_sub(a.messages.len()),
            workspace_changed: a.workspace != b.workspace,
        }),
        _ => None,
    };

    let task_diff = match (&from.task, &to.task) {
        (Some(a), Some(b)) => Some(TaskDiff {
            status_changed: (a.status != b.status).then_some((a.status, b.status)),
            assignee_changed: (a.assignee != b.assignee)
                .then_some((a.assignee.clone(), b.assignee.clone())),
            output_changed: a.output != b.output,
            error_changed: a.error != b.error,
        }),
        _ => None,
    };

    Some(StateComparison {
        from_sequence: from_seq,
        to_sequence: to_seq,
        time_delta: to.timestamp - from.timestamp,
        snapshots_between: between.len(),
        actions_between,
        errors_between,
        workspace_diff,
        session_diff,
        task_diff,
    })
}

/// One field whose transitions `find_state_transitions` can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionField {
    TaskStatus,
    SessionStatus,
    CheckpointType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
}

fn field_value(snap: &ExecutionSnapshot, field: TransitionField) -> Option<String> {
    match field {
        TransitionField::TaskStatus => snap.task_state.as_ref().map(|t| t.status.as_str().to_string()),
        TransitionField::SessionStatus => snap.session_state.as_ref().map(|s| s.status.as_str().to_string()),
        TransitionField::CheckpointType => Some(snap.checkpoint_type.as_str().to_string()),
    }
}

/// Ordered list of transitions of `field` across consecutive snapshots that
/// carry a value for it.
pub fn find_state_transitions(timeline: &Timeline, field: TransitionField) -> Vec<StateTransition> {
    let mut transitions = Vec::new();
    let mut previous: Option<(u64, String)> = None;

    for snap in timeline.snapshots() {
        let Some(value) = field_value(snap, field) else {
            continue;
        };
        if let Some((_, prev_value)) = &previous {
            if *prev_value != value {
                transitions.push(StateTransition {
                    sequence: snap.sequence_num,
                    timestamp: snap.timestamp,
                    from: prev_value.clone(),
                    to: value.clone(),
                });
            }
        }
        previous = Some((snap.sequence_num, value));
    }

    transitions
}

trait StatusAsStr {
    fn as_str(&self) -> &'static str;
}

impl StatusAsStr for TaskStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Started => "started",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Retrying => "retrying",
        }
    }
}

impl StatusAsStr for SessionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Idle => "idle",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use timewarp_store::{MemoryStore, SnapshotStore};
    use timewarp_testing::fixtures;
    use timewarp_types::Context;

    fn timeline_for(execution_id: &str, snaps: Vec<ExecutionSnapshot>) -> Timeline {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        let ctx = Context::background();
        for snap in snaps {
            store.save(&ctx, snap).unwrap();
        }
        Timeline::new(&ctx, store, execution_id).unwrap()
    }

    #[test]
    fn reconstruct_accumulates_workspace_in_order() {
        let mut snaps = fixtures::sample_execution("E1");
        snaps[1].workspace_state = Some(HashMap::from([("a".to_string(), serde_json::json!(1))]));
        snaps[3].workspace_state = Some(HashMap::from([("b".to_string(), serde_json::json!(2))]));
        let t = timeline_for("E1", snaps);

        let state = reconstruct(&t, 4).unwrap();
        assert_eq!(state.workspace.get("a"), Some(&serde_json::json!(1)));
        assert_eq!(state.workspace.get("b"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn reconstruct_collects_action_history_not_just_the_latest() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        let state = reconstruct(&t, 5).unwrap();
        assert_eq!(state.previous_actions.len(), 2, "tool_call_start and tool_call_end both carry an action");
    }

    #[test]
    fn reconstruct_missing_sequence_returns_none() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        assert!(reconstruct(&t, 999).is_none());
    }

    #[test]
    fn compare_states_swaps_out_of_order_sequences() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        let forward = compare_states(&t, 1, 5).unwrap();
        let backward = compare_states(&t, 5, 1).unwrap();
        assert_eq!(forward.from_sequence, backward.from_sequence);
        assert_eq!(forward.to_sequence, backward.to_sequence);
    }

    #[test]
    fn find_state_transitions_tracks_checkpoint_type_changes() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        let transitions = find_state_transitions(&t, TransitionField::CheckpointType);
        assert_eq!(transitions.len(), t.len() - 1, "every consecutive pair differs in this fixture");
    }
}
