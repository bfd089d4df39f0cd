use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointKind;
use crate::snapshot::{ErrorSnapshot, ExecutionSnapshot};
use crate::value::Value;

/// Terminal status of an execution, derived from its last checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// Derived, non-stored summary of one execution's snapshot log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub agent_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub total_steps: usize,
    pub error_count: usize,
    pub checkpoint_counts: HashMap<CheckpointKind, usize>,
    pub status: ExecutionStatus,
    pub final_output: Option<Value>,
    pub final_error: Option<ErrorSnapshot>,
}

impl ExecutionSummary {
    /// Compute a summary from an ascending, non-empty slice of snapshots
    /// belonging to a single execution. The store never caches this — it's
    /// always recomputed from the stored rows.
    pub fn from_snapshots(execution_id: &str, snapshots: &[ExecutionSnapshot]) -> Option<Self> {
        let first = snapshots.first()?;
        let last = snapshots.last()?;

        let mut checkpoint_counts: HashMap<CheckpointKind, usize> = HashMap::new();
        let mut error_count = 0usize;
        for snap in snapshots {
            *checkpoint_counts.entry(snap.checkpoint_type).or_insert(0) += 1;
            if snap.has_error() {
                error_count += 1;
            }
        }

        let status = match last.checkpoint_type {
            CheckpointKind::TaskCompleted => ExecutionStatus::Completed,
            CheckpointKind::TaskFailed | CheckpointKind::Error => ExecutionStatus::Failed,
            _ => ExecutionStatus::Running,
        };

        let final_output = snapshots.iter().rev().find_map(|s| s.output.clone());
        let final_error = snapshots.iter().rev().find_map(|s| s.error.clone());

        Some(Self {
            execution_id: execution_id.to_string(),
            agent_id: last.agent_id.clone().or_else(|| first.agent_id.clone()),
            start_time: first.timestamp,
            end_time: last.timestamp,
            duration_ms: (last.timestamp - first.timestamp).num_milliseconds(),
            total_steps: snapshots.len(),
            error_count,
            checkpoint_counts,
            status,
            final_output,
            final_error,
        })
    }
}

/// Aggregate statistics returned by `SnapshotStore::stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_snapshots: usize,
    pub unique_executions: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
    pub approx_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ExecutionSnapshot;
    use std::collections::HashMap as StdHashMap;
    use uuid::Uuid;

    fn snap(seq: u64, kind: CheckpointKind) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: Uuid::new_v4(),
            execution_id: "E1".to_string(),
            sequence_num: seq,
            timestamp: Utc::now(),
            checkpoint_type: kind,
            agent_id: Some("agent-1".to_string()),
            task_id: None,
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
            metadata: StdHashMap::new(),
        }
    }

    #[test]
    fn scenario_record_and_list() {
        // Three snapshots, task_started /
        // tool_call_end / task_completed, must summarize to total_steps=3,
        // status=completed, per-kind counts of 1 each, error_count=0.
        let snaps = vec![
            snap(1, CheckpointKind::TaskStarted),
            snap(2, CheckpointKind::ToolCallEnd),
            snap(3, CheckpointKind::TaskCompleted),
        ];
        let summary = ExecutionSummary::from_snapshots("E1", &snaps).unwrap();
        assert_eq!(summary.total_steps, 3);
        assert_eq!(summary.status, ExecutionStatus::Completed);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.checkpoint_counts.get(&CheckpointKind::TaskStarted), Some(&1));
        assert_eq!(summary.checkpoint_counts.get(&CheckpointKind::ToolCallEnd), Some(&1));
        assert_eq!(summary.checkpoint_counts.get(&CheckpointKind::TaskCompleted), Some(&1));
    }

    #[test]
    fn crash_before_task_completed_reports_running() {
        // Resolved: preserved as-is — no
        // synthetic terminal checkpoint is invented.
        let snaps = vec![snap(1, CheckpointKind::TaskStarted), snap(2, CheckpointKind::AgentStep)];
        let summary = ExecutionSummary::from_snapshots("E1", &snaps).unwrap();
        assert_eq!(summary.status, ExecutionStatus::Running);
    }

    #[test]
    fn empty_snapshots_yields_none() {
        assert!(ExecutionSummary::from_snapshots("E1", &[]).is_none());
    }
}
