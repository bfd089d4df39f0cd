use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use timewarp_store::SnapshotStore;
use timewarp_types::{CheckpointKind, Context, ExecutionSnapshot};

use crate::error::{Error, Result};

/// An ordered view over one execution's recorded snapshots with a movable
/// cursor. Loads the full log eagerly; fine for the sizes this
/// system targets (single executions, not whole corpora).
pub struct Timeline {
    store: Arc<dyn SnapshotStore>,
    execution_id: String,
    snapshots: Vec<ExecutionSnapshot>,
    cursor: usize,
}

impl Timeline {
    pub fn new(ctx: &Context, store: Arc<dyn SnapshotStore>, execution_id: impl Into<String>) -> Result<Self> {
        let execution_id = execution_id.into();
        let snapshots = store.get_by_execution(ctx, &execution_id)?;
        if snapshots.is_empty() {
            return Err(Error::EmptyExecution(execution_id));
        }
        let cursor = snapshots.len() - 1;
        Ok(Self {
            store,
            execution_id,
            snapshots,
            cursor,
        })
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        false // constructing an empty timeline is a hard error
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &ExecutionSnapshot {
        &self.snapshots[self.cursor]
    }

    pub fn snapshots(&self) -> &[ExecutionSnapshot] {
        &self.snapshots
    }

    /// Reload from the store, rebuild, and clamp the cursor into the new
    /// range (the refreshed log may be shorter or longer).
    pub fn refresh(&mut self, ctx: &Context) -> Result<()> {
        let snapshots = self.store.get_by_execution(ctx, &self.execution_id)?;
        if snapshots.is_empty() {
            return Err(Error::EmptyExecution(self.execution_id.clone()));
        }
        self.cursor = self.cursor.min(snapshots.len() - 1);
        self.snapshots = snapshots;
        Ok(())
    }

    // --- Navigation ---

    pub fn first(&mut self) -> &ExecutionSnapshot {
        self.cursor = 0;
        self.current()
    }

    pub fn last(&mut self) -> &ExecutionSnapshot {
        self.cursor = self.snapshots.len() - 1;
        self.current()
    }

    pub fn step_forward(&mut self) -> &ExecutionSnapshot {
        self.cursor = (self.cursor + 1).min(self.snapshots.len() - 1);
        self.current()
    }

    pub fn step_backward(&mut self) -> &ExecutionSnapshot {
        self.cursor = self.cursor.saturating_sub(1);
        self.current()
    }

    pub fn step_forward_n(&mut self, n: usize) -> &ExecutionSnapshot {
        self.cursor = (self.cursor + n).min(self.snapshots.len() - 1);
        self.current()
    }

    pub fn step_backward_n(&mut self, n: usize) -> &ExecutionSnapshot {
        self.cursor = self.cursor.saturating_sub(n);
        self.current()
    }

    /// Move to the snapshot with this sequence number. Returns `None` and
    /// leaves the cursor untouched on a miss.
    pub fn jump_to(&mut self, sequence: u64) -> Option<&ExecutionSnapshot> {
        let idx = self.index_of(sequence)?;
        self.cursor = idx;
        Some(self.current())
    }

    pub fn jump_to_index(&mut self, index: usize) -> &ExecutionSnapshot {
        self.cursor = index.min(self.snapshots.len() - 1);
        self.current()
    }

    /// Move to the snapshot whose timestamp is closest (by absolute
    /// difference) to `target`.
    pub fn jump_to_timestamp(&mut self, target: DateTime<Utc>) -> &ExecutionSnapshot {
        let (idx, _) = self
            .snapshots
            .iter()
            .enumerate()
            .map(|(i, s)| (i, (s.timestamp - target).num_milliseconds().abs()))
            .min_by_key(|(_, delta)| *delta)
            .expect("timeline is never empty");
        self.cursor = idx;
        self.current()
    }

    pub fn jump_to_next_checkpoint(&mut self, kind: CheckpointKind) -> Option<&ExecutionSnapshot> {
        let idx = self.scan_forward(|s| s.checkpoint_type == kind)?;
        self.cursor = idx;
        Some(self.current())
    }

    pub fn jump_to_prev_checkpoint(&mut self, kind: CheckpointKind) -> Option<&ExecutionSnapshot> {
        let idx = self.scan_backward(|s| s.checkpoint_type == kind)?;
        self.cursor = idx;
        Some(self.current())
    }

    pub fn jump_to_next_error(&mut self) -> Option<&ExecutionSnapshot> {
        let idx = self.scan_forward(|s| s.has_error())?;
        self.cursor = idx;
        Some(self.current())
    }

    pub fn jump_to_prev_error(&mut self) -> Option<&ExecutionSnapshot> {
        let idx = self.scan_backward(|s| s.has_error())?;
        self.cursor = idx;
        Some(self.current())
    }

    pub fn jump_to_next_llm_call(&mut self) -> Option<&ExecutionSnapshot> {
        let idx = self.scan_forward(|s| s.checkpoint_type.is_llm_call())?;
        self.cursor = idx;
        Some(self.current())
    }

    pub fn jump_to_next_tool_call(&mut self) -> Option<&ExecutionSnapshot> {
        let idx = self.scan_forward(|s| s.checkpoint_type.is_tool_call())?;
        self.cursor = idx;
        Some(self.current())
    }

    fn index_of(&self, sequence: u64) -> Option<usize> {
        self.snapshots
            .binary_search_by_key(&sequence, |s| s.sequence_num)
            .ok()
    }

    fn scan_forward(&self, pred: impl Fn(&ExecutionSnapshot) -> bool) -> Option<usize> {
        self.snapshots
            .iter()
            .enumerate()
            .skip(self.cursor + 1)
            .find(|(_, s)| pred(s))
            .map(|(i, _)| i)
    }

    fn scan_backward(&self, pred: impl Fn(&ExecutionSnapshot) -> bool) -> Option<usize> {
        self.snapshots[..self.cursor]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, s)| pred(s))
            .map(|(i, _)| i)
    }

    // --- Query (no cursor side-effect) ---

    pub fn range_by_sequence(&self, from: u64, to: u64) -> Vec<&ExecutionSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.sequence_num >= from && s.sequence_num <= to)
            .collect()
    }

    pub fn range_by_index(&self, from: usize, to: usize) -> &[ExecutionSnapshot] {
        let to = to.min(self.snapshots.len().saturating_sub(1));
        if from > to {
            &[]
        } else {
            &self.snapshots[from..=to]
        }
    }

    pub fn by_kind(&self, kind: CheckpointKind) -> Vec<&ExecutionSnapshot> {
        self.snapshots.iter().filter(|s| s.checkpoint_type == kind).collect()
    }

    pub fn by_kinds(&self, kinds: &[CheckpointKind]) -> Vec<&ExecutionSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| kinds.contains(&s.checkpoint_type))
            .collect()
    }

    pub fn errors_only(&self) -> Vec<&ExecutionSnapshot> {
        self.snapshots.iter().filter(|s| s.has_error()).collect()
    }

    pub fn llm_calls(&self) -> Vec<&ExecutionSnapshot> {
        self.snapshots.iter().filter(|s| s.checkpoint_type.is_llm_call()).collect()
    }

    pub fn tool_calls(&self) -> Vec<&ExecutionSnapshot> {
        self.snapshots.iter().filter(|s| s.checkpoint_type.is_tool_call()).collect()
    }

    pub fn task_snapshots(&self) -> Vec<&ExecutionSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.checkpoint_type.is_task_lifecycle() || s.task_state.is_some())
            .collect()
    }

    pub fn by_task_id(&self, task_id: &str) -> Vec<&ExecutionSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.task_id.as_deref() == Some(task_id))
            .collect()
    }

    pub fn by_agent_id(&self, agent_id: &str) -> Vec<&ExecutionSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.agent_id.as_deref() == Some(agent_id))
            .collect()
    }

    // --- Status ---

    pub fn can_step_forward(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn can_step_backward(&self) -> bool {
        self.cursor > 0
    }

    pub fn is_at_start(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor + 1 == self.snapshots.len()
    }

    pub fn progress(&self) -> f64 {
        if self.snapshots.len() <= 1 {
            100.0
        } else {
            (self.cursor as f64 / (self.snapshots.len() - 1) as f64) * 100.0
        }
    }

    // --- Analytics ---

    pub fn duration(&self) -> Duration {
        self.snapshots.last().unwrap().timestamp - self.snapshots.first().unwrap().timestamp
    }

    pub fn duration_until_current(&self) -> Duration {
        self.current().timestamp - self.snapshots.first().unwrap().timestamp
    }

    pub fn time_between(&self, seq_a: u64, seq_b: u64) -> Option<Duration> {
        let a = self.snapshots.get(self.index_of(seq_a)?)?;
        let b = self.snapshots.get(self.index_of(seq_b)?)?;
        Some(b.timestamp - a.timestamp)
    }

    pub fn count_checkpoints(&self) -> HashMap<CheckpointKind, usize> {
        let mut counts = HashMap::new();
        for snap in &self.snapshots {
            *counts.entry(snap.checkpoint_type).or_insert(0) += 1;
        }
        counts
    }

    /// Top-`limit` snapshots with a timed action, slowest first.
    pub fn find_slowest_operations(&self, limit: usize) -> Vec<&ExecutionSnapshot> {
        let mut timed: Vec<&ExecutionSnapshot> = self
            .snapshots
            .iter()
            .filter(|s| matches!(&s.action, Some(a) if a.duration_ms.unwrap_or(0) > 0))
            .collect();
        timed.sort_by(|a, b| {
            let a_dur = a.action.as_ref().and_then(|a| a.duration_ms).unwrap_or(0);
            let b_dur = b.action.as_ref().and_then(|a| a.duration_ms).unwrap_or(0);
            b_dur.cmp(&a_dur)
        });
        timed.truncate(limit);
        timed
    }

    /// Task lifecycle snapshots, errors and decision points, in timeline
    /// order — the subsequence worth replaying to understand what happened.
    pub fn critical_path(&self) -> Vec<&ExecutionSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| {
                s.checkpoint_type.is_task_lifecycle()
                    || s.has_error()
                    || s.checkpoint_type == CheckpointKind::DecisionPoint
            })
            .collect()
    }

    /// Checks the universal invariants a recorded log is expected to satisfy
    /// (contiguous, strictly increasing sequence numbers; non-decreasing
    /// timestamps) and reports violations instead of panicking.
    pub fn validate(&self) -> ValidationReport {
        let mut issues = Vec::new();
        let mut previous: Option<&ExecutionSnapshot> = None;
        for snap in &self.snapshots {
            if let Some(prev) = previous {
                if snap.sequence_num <= prev.sequence_num {
                    issues.push(ValidationIssue::NonMonotonicSequence {
                        after: prev.sequence_num,
                        found: snap.sequence_num,
                    });
                } else if snap.sequence_num != prev.sequence_num + 1 {
                    issues.push(ValidationIssue::SequenceGap {
                        after: prev.sequence_num,
                        found: snap.sequence_num,
                    });
                }
                if snap.timestamp < prev.timestamp {
                    issues.push(ValidationIssue::TimestampWentBackward {
                        sequence: snap.sequence_num,
                    });
                }
            }
            previous = Some(snap);
        }
        ValidationReport { issues }
    }
}

/// One violation of a universal timeline invariant, found by [`Timeline::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A sequence number repeated or decreased.
    NonMonotonicSequence { after: u64, found: u64 },
    /// A gap in the sequence run; not itself a correctness bug (only
    /// strictly increasing, not contiguous, numbers are required) but
    /// worth surfacing.
    SequenceGap { after: u64, found: u64 },
    TimestampWentBackward { sequence: u64 },
}

/// Result of [`Timeline::validate`]. Empty `issues` means the log is clean.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use timewarp_store::MemoryStore;
    use timewarp_testing::fixtures;

    fn timeline_for(execution_id: &str, snaps: Vec<ExecutionSnapshot>) -> Timeline {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        let ctx = Context::background();
        for snap in snaps {
            store.save(&ctx, snap).unwrap();
        }
        Timeline::new(&ctx, store, execution_id).unwrap()
    }

    #[test]
    fn initial_cursor_is_last() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        assert_eq!(t.cursor(), t.len() - 1);
        assert!(t.is_at_end());
    }

    #[test]
    fn step_backward_and_forward_are_clamped() {
        let mut t = timeline_for("E1", fixtures::sample_execution("E1"));
        t.first();
        assert!(t.is_at_start());
        t.step_backward();
        assert!(t.is_at_start(), "stepping backward past zero stays at zero");

        t.last();
        t.step_forward();
        assert!(t.is_at_end(), "stepping forward past the end stays at the end");
    }

    #[test]
    fn jump_to_missing_sequence_leaves_cursor_untouched() {
        let mut t = timeline_for("E1", fixtures::sample_execution("E1"));
        t.first();
        let before = t.cursor();
        assert!(t.jump_to(999).is_none());
        assert_eq!(t.cursor(), before);
    }

    #[test]
    fn jump_to_next_error_finds_the_error_checkpoint() {
        let mut t = timeline_for("E2", fixtures::execution_with_errors("E2"));
        t.first();
        let found = t.jump_to_next_error().unwrap();
        assert!(found.has_error());
    }

    #[test]
    fn critical_path_excludes_plain_agent_steps() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        let path = t.critical_path();
        assert!(path.iter().all(|s| s.checkpoint_type != timewarp_types::CheckpointKind::AgentStep));
        assert!(!path.is_empty());
    }

    #[test]
    fn progress_is_100_at_the_last_snapshot() {
        let mut t = timeline_for("E1", fixtures::sample_execution("E1"));
        t.last();
        assert_eq!(t.progress(), 100.0);
        t.first();
        assert_eq!(t.progress(), 0.0);
    }

    #[test]
    fn find_slowest_operations_sorts_descending() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        let slowest = t.find_slowest_operations(5);
        assert_eq!(slowest.len(), 1, "only one fixture checkpoint carries a timed action");
        assert_eq!(slowest[0].action.as_ref().unwrap().duration_ms, Some(12));
    }

    #[test]
    fn validate_reports_clean_on_a_well_formed_fixture() {
        let t = timeline_for("E1", fixtures::sample_execution("E1"));
        let report = t.validate();
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn validate_flags_a_sequence_gap() {
        // MemoryStore dedups and sorts by sequence_num, so the only invariant
        // violation a fixture can actually reproduce through the store is a
        // gap between otherwise-increasing numbers.
        let mut snaps = fixtures::sample_execution("E1");
        for s in snaps.iter_mut().skip(1) {
            s.sequence_num += 5;
        }
        let t = timeline_for("E1", snaps);
        let report = t.validate();
        assert!(!report.is_clean());
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::SequenceGap { .. })));
    }

    #[test]
    fn validate_flags_a_timestamp_going_backward() {
        let mut snaps = fixtures::sample_execution("E1");
        snaps[2].timestamp = fixtures::base_timestamp();
        let t = timeline_for("E1", snaps);
        let report = t.validate();
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::TimestampWentBackward { .. })));
    }
}
