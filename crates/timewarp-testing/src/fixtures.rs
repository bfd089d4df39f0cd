//! Sample execution data for store, engine and replay tests.
//!
//! Fixtures build deterministic sequences of `ExecutionSnapshot`s so tests
//! can assert on ordering and derived summaries without depending on wall
//! clock time.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use timewarp_types::{
    ActionSnapshot, CheckpointKind, ErrorSnapshot, ExecutionSnapshot, TaskState, TaskStatus,
};

/// Fixed origin so successive snapshots have stable, comparable timestamps.
pub fn base_timestamp() -> DateTime<Utc> {
    "2024-01-01T00:00:00Z".parse().expect("valid rfc3339 literal")
}

/// Build one snapshot at `seq`, `seq` seconds after [`base_timestamp`].
pub fn snapshot_at(execution_id: &str, seq: u64, kind: CheckpointKind) -> ExecutionSnapshot {
    ExecutionSnapshot {
        id: Uuid::new_v4(),
        execution_id: execution_id.to_string(),
        sequence_num: seq,
        timestamp: base_timestamp() + Duration::seconds(seq as i64),
        checkpoint_type: kind,
        agent_id: Some("agent-1".to_string()),
        task_id: Some("task-1".to_string()),
        worker_id: None,
        session_id: Some("session-1".to_string()),
        trace_id: None,
        span_id: None,
        parent_span_id: None,
        session_state: None,
        task_state: None,
        workspace_state: None,
        action: None,
        input: None,
        output: None,
        error: None,
        metadata: HashMap::new(),
    }
}

/// A clean task lifecycle: created, assigned, started, one tool call,
/// one agent step, completed. Seven snapshots, sequence 1..=7.
pub fn sample_execution(execution_id: &str) -> Vec<ExecutionSnapshot> {
    let mut snaps = vec![
        snapshot_at(execution_id, 1, CheckpointKind::TaskCreated),
        snapshot_at(execution_id, 2, CheckpointKind::TaskAssigned),
        snapshot_at(execution_id, 3, CheckpointKind::TaskStarted),
    ];

    let mut start_action = ActionSnapshot::tool_call("read_file");
    start_action.input = Some(serde_json::json!({"path": "a.rs"}));
    let mut tool_start = snapshot_at(execution_id, 4, CheckpointKind::ToolCallStart);
    tool_start.action = Some(start_action);
    snaps.push(tool_start);

    let mut tool_end = snapshot_at(execution_id, 5, CheckpointKind::ToolCallEnd);
    let mut action = ActionSnapshot::tool_call("read_file");
    action.input = Some(serde_json::json!({"path": "a.rs"}));
    action.output = Some(serde_json::json!("fn main() {}"));
    action.duration_ms = Some(12);
    action.success = true;
    tool_end.action = Some(action);
    snaps.push(tool_end);

    snaps.push(snapshot_at(execution_id, 6, CheckpointKind::AgentStep));

    let mut completed = snapshot_at(execution_id, 7, CheckpointKind::TaskCompleted);
    completed.task_state = Some(TaskState {
        id: "task-1".to_string(),
        name: "read and summarize".to_string(),
        task_type: "analysis".to_string(),
        priority: None,
        status: TaskStatus::Completed,
        assignee: Some("agent-1".to_string()),
        creator: None,
        depends_on: Vec::new(),
        input: None,
        output: Some(serde_json::json!("done")),
        error: None,
    });
    completed.output = Some(serde_json::json!("done"));
    snaps.push(completed);

    snaps
}

/// Same shape as [`sample_execution`] but the tool call fails and the
/// execution ends in `TaskFailed` with an attached error.
pub fn execution_with_errors(execution_id: &str) -> Vec<ExecutionSnapshot> {
    let mut snaps = vec![
        snapshot_at(execution_id, 1, CheckpointKind::TaskCreated),
        snapshot_at(execution_id, 2, CheckpointKind::TaskStarted),
        snapshot_at(execution_id, 3, CheckpointKind::ToolCallStart),
    ];

    let mut errored = snapshot_at(execution_id, 4, CheckpointKind::Error);
    errored.error = Some(ErrorSnapshot::new("io_error", "file not found"));
    snaps.push(errored);

    let mut failed = snapshot_at(execution_id, 5, CheckpointKind::TaskFailed);
    failed.error = Some(ErrorSnapshot::new("io_error", "file not found"));
    snaps.push(failed);

    snaps
}

/// An execution with no terminal checkpoint, as if the process crashed
/// mid-task. Useful for asserting the "still running" summary behavior.
pub fn crashed_execution(execution_id: &str) -> Vec<ExecutionSnapshot> {
    vec![
        snapshot_at(execution_id, 1, CheckpointKind::TaskCreated),
        snapshot_at(execution_id, 2, CheckpointKind::TaskStarted),
        snapshot_at(execution_id, 3, CheckpointKind::AgentStep),
    ]
}
