use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointKind;
use crate::snapshot::ExecutionSnapshot;

/// Query filter combining every field with logical AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFilter {
    pub execution_id: Option<String>,
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub session_id: Option<String>,
    pub checkpoint_type: Option<CheckpointKind>,
    pub checkpoint_types: Option<Vec<CheckpointKind>>,
    pub from_timestamp: Option<DateTime<Utc>>,
    pub to_timestamp: Option<DateTime<Utc>>,
    pub from_sequence: Option<u64>,
    pub to_sequence: Option<u64>,
    pub has_error: Option<bool>,
    pub trace_id: Option<String>,
}

impl SnapshotFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    pub fn with_checkpoint_type(mut self, kind: CheckpointKind) -> Self {
        self.checkpoint_type = Some(kind);
        self
    }

    pub fn with_checkpoint_types(mut self, kinds: Vec<CheckpointKind>) -> Self {
        self.checkpoint_types = Some(kinds);
        self
    }

    pub fn with_has_error(mut self, has_error: bool) -> Self {
        self.has_error = Some(has_error);
        self
    }

    /// The single predicate every store backend implements its filtering
    /// against, so "every snapshot returned satisfies the filter" holds by
    /// construction rather than by parallel re-implementation.
    pub fn matches(&self, snap: &ExecutionSnapshot) -> bool {
        if let Some(ref id) = self.execution_id {
            if &snap.execution_id != id {
                return false;
            }
        }
        if let Some(ref id) = self.agent_id {
            if snap.agent_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(ref id) = self.task_id {
            if snap.task_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(ref id) = self.session_id {
            if snap.session_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.checkpoint_type {
            if snap.checkpoint_type != kind {
                return false;
            }
        }
        if let Some(ref kinds) = self.checkpoint_types {
            if !kinds.contains(&snap.checkpoint_type) {
                return false;
            }
        }
        if let Some(from) = self.from_timestamp {
            if snap.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to_timestamp {
            if snap.timestamp > to {
                return false;
            }
        }
        if let Some(from) = self.from_sequence {
            if snap.sequence_num < from {
                return false;
            }
        }
        if let Some(to) = self.to_sequence {
            if snap.sequence_num > to {
                return false;
            }
        }
        if let Some(has_error) = self.has_error {
            if snap.has_error() != has_error {
                return false;
            }
        }
        if let Some(ref id) = self.trace_id {
            if snap.trace_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Sort order for `query` results. Default is `SequenceAsc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    SequenceAsc,
    SequenceDesc,
    TimeAsc,
    TimeDesc,
}

impl OrderBy {
    pub fn sort(&self, snapshots: &mut [ExecutionSnapshot]) {
        match self {
            OrderBy::SequenceAsc => snapshots.sort_by_key(|s| s.sequence_num),
            OrderBy::SequenceDesc => snapshots.sort_by_key(|s| std::cmp::Reverse(s.sequence_num)),
            OrderBy::TimeAsc => snapshots.sort_by_key(|s| s.timestamp),
            OrderBy::TimeDesc => snapshots.sort_by_key(|s| std::cmp::Reverse(s.timestamp)),
        }
    }
}

pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Paginated query result. `total_count` is the pre-pagination match count;
/// `has_more` tells the caller whether another page exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub snapshots: Vec<ExecutionSnapshot>,
    pub total_count: usize,
    pub has_more: bool,
}

impl QueryResult {
    pub fn new(snapshots: Vec<ExecutionSnapshot>, total_count: usize, offset: usize) -> Self {
        let has_more = offset + snapshots.len() < total_count;
        Self {
            snapshots,
            total_count,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ExecutionSnapshot;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn snap(seq: u64, kind: CheckpointKind, err: bool) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: Uuid::new_v4(),
            execution_id: "E1".to_string(),
            sequence_num: seq,
            timestamp: Utc::now(),
            checkpoint_type: kind,
            agent_id: None,
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
            error: if err {
                Some(crate::snapshot::ErrorSnapshot::new("Timeout", "x"))
            } else {
                None
            },
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn matches_combines_with_and() {
        let filter = SnapshotFilter::new()
            .with_execution_id("E1")
            .with_checkpoint_type(CheckpointKind::Error)
            .with_has_error(true);

        assert!(filter.matches(&snap(1, CheckpointKind::Error, true)));
        assert!(!filter.matches(&snap(1, CheckpointKind::Error, false)));
        assert!(!filter.matches(&snap(1, CheckpointKind::TaskStarted, true)));
    }

    #[test]
    fn has_more_respects_offset() {
        let result = QueryResult::new(vec![snap(1, CheckpointKind::TaskStarted, false)], 5, 0);
        assert!(result.has_more);
        let result = QueryResult::new(vec![snap(5, CheckpointKind::TaskStarted, false)], 5, 4);
        assert!(!result.has_more);
    }
}
