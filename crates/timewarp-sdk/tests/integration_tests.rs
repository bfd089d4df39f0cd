//! The six literal end-to-end scenarios: a walkthrough of record, list,
//! reconstruct, navigate, replay and branch through the public `Client`
//! facade rather than any one layer's own test suite.

use std::collections::HashMap;
use uuid::Uuid;

use timewarp_branch::BranchOptions;
use timewarp_replay::{ModificationType, ReplayOptions};
use timewarp_sdk::Client;
use timewarp_store::SnapshotStore;
use timewarp_types::{CheckpointKind, Context, ExecutionSnapshot, ExecutionStatus, Modification};

fn snap(execution_id: &str, seq: u64, kind: CheckpointKind) -> ExecutionSnapshot {
    ExecutionSnapshot {
        id: Uuid::new_v4(),
        execution_id: execution_id.to_string(),
        sequence_num: seq,
        timestamp: chrono::Utc::now() + chrono::Duration::seconds(seq as i64),
        checkpoint_type: kind,
        agent_id: Some("agent-1".to_string()),
        task_id: Some("task-1".to_string()),
        worker_id: None,
        session_id: None,
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

#[test]
fn scenario_1_record_and_list() {
    let client = Client::open_in_memory();
    let ctx = Context::background();

    for s in [
        snap("E1", 1, CheckpointKind::TaskStarted),
        snap("E1", 2, CheckpointKind::ToolCallEnd),
        snap("E1", 3, CheckpointKind::TaskCompleted),
    ] {
        client.store().save(&ctx, s).unwrap();
    }

    let summaries = client.list_executions(&ctx, 10, 0).unwrap();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.total_steps, 3);
    assert_eq!(summary.status, ExecutionStatus::Completed);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.checkpoint_counts.get(&CheckpointKind::TaskStarted), Some(&1));
    assert_eq!(summary.checkpoint_counts.get(&CheckpointKind::ToolCallEnd), Some(&1));
    assert_eq!(summary.checkpoint_counts.get(&CheckpointKind::TaskCompleted), Some(&1));
}

#[test]
fn scenario_2_prefix_reconstruct() {
    let client = Client::open_in_memory();
    let ctx = Context::background();

    let mut s1 = snap("E1", 1, CheckpointKind::WorkspaceUpdate);
    s1.workspace_state = Some(HashMap::from([("a".to_string(), serde_json::json!(1))]));
    let mut s2 = snap("E1", 2, CheckpointKind::WorkspaceUpdate);
    s2.workspace_state = Some(HashMap::from([("b".to_string(), serde_json::json!(2))]));
    let mut s3 = snap("E1", 3, CheckpointKind::WorkspaceUpdate);
    s3.workspace_state = Some(HashMap::from([("a".to_string(), serde_json::json!(3))]));

    for s in [s1, s2, s3] {
        client.store().save(&ctx, s).unwrap();
    }

    let at_3 = client.reconstruct(&ctx, "E1", 3).unwrap();
    assert_eq!(at_3.workspace.get("a"), Some(&serde_json::json!(3)));
    assert_eq!(at_3.workspace.get("b"), Some(&serde_json::json!(2)));

    let at_1 = client.reconstruct(&ctx, "E1", 1).unwrap();
    assert_eq!(at_1.workspace.len(), 1);
    assert_eq!(at_1.workspace.get("a"), Some(&serde_json::json!(1)));
}

#[test]
fn scenario_3_jump_to_next_error() {
    let client = Client::open_in_memory();
    let ctx = Context::background();

    for seq in 1..=10u64 {
        let kind = if seq == 4 || seq == 9 {
            CheckpointKind::Error
        } else {
            CheckpointKind::AgentStep
        };
        client.store().save(&ctx, snap("E1", seq, kind)).unwrap();
    }

    let mut timeline = client.timeline(&ctx, "E1").unwrap();
    timeline.jump_to_index(2);

    let first = timeline.jump_to_next_error().unwrap();
    assert_eq!(first.sequence_num, 4);

    let second = timeline.jump_to_next_error().unwrap();
    assert_eq!(second.sequence_num, 9);

    let cursor_before = timeline.cursor();
    assert!(timeline.jump_to_next_error().is_none());
    assert_eq!(timeline.cursor(), cursor_before);
}

#[test]
fn scenario_4_simulated_replay() {
    let client = Client::open_in_memory();
    let ctx = Context::background();

    for seq in 1..=10u64 {
        let mut s = snap("E1", seq, CheckpointKind::AgentStep);
        s.output = Some(serde_json::json!({"step": seq}));
        client.store().save(&ctx, s).unwrap();
    }

    let options = ReplayOptions {
        compare_with_original: true,
        ..Default::default()
    };
    let result = client.replay(&ctx, "E1", 5, options).unwrap();

    assert!(result.success);
    assert_eq!(result.steps_replayed(), 6);
    assert!(result.differences.is_empty());
    assert_eq!(
        result.steps.last().unwrap().output,
        Some(serde_json::json!({"step": 10}))
    );
}

#[test]
fn scenario_5_what_if() {
    let client = Client::open_in_memory();
    let ctx = Context::background();

    for seq in 1..=5u64 {
        let mut s = snap("E1", seq, CheckpointKind::AgentStep);
        s.output = Some(serde_json::json!({"step": seq}));
        client.store().save(&ctx, s).unwrap();
    }

    let modification = Modification::new(ModificationType::Input, "value", serde_json::json!("patched"));
    let options = BranchOptions {
        modification: Some(modification),
        ..Default::default()
    };
    let branch = client.what_if(&ctx, "E1", 3, options).unwrap();

    assert_eq!(branch.status, timewarp_branch::BranchStatus::Completed);
    let comparison = client.branches().compare_with_parent(&ctx, &branch.id).unwrap();
    assert!(comparison.a_success);
    assert!(comparison.b_success);
    assert_eq!(comparison.step_count_delta, 0);
}

#[test]
fn scenario_6_idempotent_upsert() {
    let client = Client::open_in_memory();
    let ctx = Context::background();

    let mut first = snap("E1", 5, CheckpointKind::ToolCallEnd);
    first.output = Some(serde_json::json!("first"));
    client.store().save(&ctx, first).unwrap();

    let mut second = snap("E1", 5, CheckpointKind::ToolCallEnd);
    second.output = Some(serde_json::json!("second"));
    client.store().save(&ctx, second).unwrap();

    let at_5 = client.store().get_at_sequence(&ctx, "E1", 5).unwrap();
    assert_eq!(at_5.output, Some(serde_json::json!("second")));

    let all = client.store().get_by_execution(&ctx, "E1").unwrap();
    assert_eq!(all.iter().filter(|s| s.sequence_num == 5).count(), 1);
}
