use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use timewarp_replay::{ReplayEngine, ReplayMode, ReplayOptions, ReplayResult, ReplayStep};
use timewarp_store::SnapshotStore;
use timewarp_types::{Context, ErrorSnapshot, ExecutionSnapshot};

use crate::error::{Error, Result};
use crate::types::{
    Branch, BranchComparison, BranchOptions, BranchStatus, BranchTreeNode, SequenceDiff,
    SequenceDiffEntry,
};

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn replay_total_duration_ms(result: &ReplayResult) -> i64 {
    result.steps.iter().map(|s| s.duration_ms).sum()
}

/// Turn a replay's steps into standalone snapshots so the branch's timeline
/// can be diffed against the parent the same way two recorded executions
/// are. `ReplayStep` only carries what replay observed, so identity and
/// context fields it never touched (agent/task/session ids, workspace,
/// action detail) are left empty.
fn steps_to_snapshots(execution_id: &str, steps: &[ReplayStep]) -> Vec<ExecutionSnapshot> {
    steps
        .iter()
        .map(|step| ExecutionSnapshot {
            id: Uuid::new_v4(),
            execution_id: execution_id.to_string(),
            sequence_num: step.sequence,
            timestamp: Utc::now(),
            checkpoint_type: step.checkpoint_type,
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
            input: step.input.clone(),
            output: step.output.clone(),
            error: step
                .error
                .as_ref()
                .map(|msg| ErrorSnapshot::new("replay_error", msg.clone())),
            metadata: HashMap::new(),
        })
        .collect()
}

/// Per-sequence diff between two materialized timelines: every
/// sequence in the union is classified as added, removed, or changed.
fn diff_sequences(a: &[ExecutionSnapshot], b: &[ExecutionSnapshot]) -> Vec<SequenceDiffEntry> {
    let a_map: HashMap<u64, &ExecutionSnapshot> = a.iter().map(|s| (s.sequence_num, s)).collect();
    let b_map: HashMap<u64, &ExecutionSnapshot> = b.iter().map(|s| (s.sequence_num, s)).collect();

    let mut sequences: Vec<u64> = a_map.keys().chain(b_map.keys()).copied().collect();
    sequences.sort_unstable();
    sequences.dedup();

    let mut entries = Vec::new();
    for seq in sequences {
        match (a_map.get(&seq), b_map.get(&seq)) {
            (Some(_), None) => entries.push(SequenceDiffEntry { sequence: seq, diff: SequenceDiff::Removed }),
            (None, Some(_)) => entries.push(SequenceDiffEntry { sequence: seq, diff: SequenceDiff::Added }),
            (Some(x), Some(y)) => {
                let mut fields = Vec::new();
                if x.checkpoint_type != y.checkpoint_type {
                    fields.push("checkpoint_type".to_string());
                }
                if x.output != y.output {
                    fields.push("output".to_string());
                }
                if x.has_error() != y.has_error() {
                    fields.push("has_error".to_string());
                }
                if !fields.is_empty() {
                    entries.push(SequenceDiffEntry {
                        sequence: seq,
                        diff: SequenceDiff::Changed { fields },
                    });
                }
            }
            (None, None) => unreachable!("sequence drawn from the union of both maps"),
        }
    }
    entries
}

/// Owns the in-memory `branch_id -> Branch` registry and drives replay for
/// each branch. Every branch is rooted at a parent execution (or,
/// transitively, at another branch's replayed timeline).
pub struct BranchEngine {
    store: Arc<dyn SnapshotStore>,
    replay_engine: Arc<ReplayEngine>,
    branches: RwLock<HashMap<String, Branch>>,
}

impl BranchEngine {
    pub fn new(store: Arc<dyn SnapshotStore>, replay_engine: Arc<ReplayEngine>) -> Self {
        Self {
            store,
            replay_engine,
            branches: RwLock::new(HashMap::new()),
        }
    }

    fn insert_branch(
        &self,
        exec_id: String,
        parent_branch_id: Option<String>,
        seq: u64,
        options: BranchOptions,
    ) -> Branch {
        let branch = Branch {
            id: short_id(),
            name: options.name,
            description: options.description,
            parent_execution_id: exec_id,
            parent_branch_id,
            branch_point_sequence: seq,
            modification: options.modification,
            mode: options.mode,
            status: BranchStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            comparison: None,
            error: None,
            materialized_timeline: None,
        };
        self.branches
            .write()
            .unwrap()
            .insert(branch.id.clone(), branch.clone());
        branch
    }

    pub fn create_branch(
        &self,
        ctx: &Context,
        exec_id: &str,
        seq: u64,
        options: BranchOptions,
    ) -> Result<Branch> {
        self.store.get_at_sequence(ctx, exec_id, seq)?;
        Ok(self.insert_branch(exec_id.to_string(), None, seq, options))
    }

    pub fn create_branch_from_branch(
        &self,
        parent_branch_id: &str,
        seq: u64,
        options: BranchOptions,
    ) -> Result<Branch> {
        let parent = self.get_branch(parent_branch_id)?;
        if parent.status != BranchStatus::Completed {
            return Err(Error::FailedPrecondition(format!(
                "branch {} must be completed before branching from it",
                parent_branch_id
            )));
        }
        let replay_execution_id = parent
            .result
            .as_ref()
            .map(|r| r.replay_execution_id.clone())
            .ok_or_else(|| {
                Error::FailedPrecondition(format!("branch {} has no replay result", parent_branch_id))
            })?;
        Ok(self.insert_branch(
            replay_execution_id,
            Some(parent_branch_id.to_string()),
            seq,
            options,
        ))
    }

    pub fn get_branch(&self, branch_id: &str) -> Result<Branch> {
        self.branches
            .read()
            .unwrap()
            .get(branch_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("branch {}", branch_id)))
    }

    pub fn execute_branch(&self, ctx: &Context, branch_id: &str) -> Result<Branch> {
        let mut branch = self.get_branch(branch_id)?;
        branch.status = BranchStatus::Running;
        branch.started_at = Some(Utc::now());
        self.branches
            .write()
            .unwrap()
            .insert(branch.id.clone(), branch.clone());

        let options = ReplayOptions {
            mode: branch.mode.unwrap_or(ReplayMode::Hybrid),
            modification: branch.modification.clone(),
            compare_with_original: true,
            ..Default::default()
        };

        let outcome = self
            .replay_engine
            .replay_from(ctx, &branch.parent_execution_id, branch.branch_point_sequence, options);

        match outcome {
            Ok(result) => {
                let materialized = steps_to_snapshots(&result.replay_execution_id, &result.steps);
                branch.materialized_timeline = Some(materialized).filter(|s| !s.is_empty());
                branch.result = Some(result);
                branch.status = BranchStatus::Completed;
                branch.completed_at = Some(Utc::now());
            }
            Err(err) => {
                branch.status = BranchStatus::Failed;
                branch.completed_at = Some(Utc::now());
                branch.error = Some(err.to_string());
                self.branches
                    .write()
                    .unwrap()
                    .insert(branch.id.clone(), branch.clone());
                return Err(err.into());
            }
        }

        self.branches
            .write()
            .unwrap()
            .insert(branch.id.clone(), branch.clone());
        Ok(branch)
    }

    pub async fn execute_branch_async(self: &Arc<Self>, ctx: Context, branch_id: String) -> Result<Branch> {
        let engine = Arc::clone(self);
        tokio::task::spawn_blocking(move || engine.execute_branch(&ctx, &branch_id))
            .await
            .map_err(|join_err| Error::FailedPrecondition(join_err.to_string()))?
    }

    pub fn compare_branches(&self, ctx: &Context, a: &str, b: &str) -> Result<BranchComparison> {
        let branch_a = self.get_branch(a)?;
        let branch_b = self.get_branch(b)?;
        self.compare_completed(ctx, &branch_a, &branch_b)
    }

    fn compare_completed(&self, _ctx: &Context, a: &Branch, b: &Branch) -> Result<BranchComparison> {
        if a.status != BranchStatus::Completed || b.status != BranchStatus::Completed {
            return Err(Error::FailedPrecondition(
                "both branches must be completed before comparing".to_string(),
            ));
        }
        let result_a = a.result.as_ref().expect("completed branch always has a result");
        let result_b = b.result.as_ref().expect("completed branch always has a result");

        let sequence_diff = match (&a.materialized_timeline, &b.materialized_timeline) {
            (Some(ta), Some(tb)) => Some(diff_sequences(ta, tb)),
            _ => None,
        };

        Ok(BranchComparison {
            label_a: a.id.clone(),
            label_b: b.id.clone(),
            duration_delta_ms: replay_total_duration_ms(result_b) - replay_total_duration_ms(result_a),
            step_count_delta: result_b.steps.len() as i64 - result_a.steps.len() as i64,
            a_success: result_a.success,
            b_success: result_b.success,
            sequence_diff,
        })
    }

    pub fn compare_with_parent(&self, ctx: &Context, branch_id: &str) -> Result<BranchComparison> {
        let mut branch = self.get_branch(branch_id)?;
        if branch.status != BranchStatus::Completed {
            return Err(Error::FailedPrecondition(format!(
                "branch {} must be completed before comparing against its parent",
                branch_id
            )));
        }
        let result = branch.result.as_ref().expect("completed branch always has a result");

        // The parent's own outcome over the same suffix the branch replayed,
        // so the two sides of the comparison are replay results of equal
        // shape rather than a replay against the whole parent execution.
        let baseline = self.replay_engine.replay_from(
            ctx,
            &branch.parent_execution_id,
            branch.branch_point_sequence,
            ReplayOptions::default(),
        )?;

        let parent_snapshots = self.store.get_by_execution(ctx, &branch.parent_execution_id)?;
        let parent_suffix: Vec<ExecutionSnapshot> = parent_snapshots
            .into_iter()
            .filter(|s| s.sequence_num >= branch.branch_point_sequence)
            .collect();
        let sequence_diff = branch
            .materialized_timeline
            .as_ref()
            .map(|branch_snaps| diff_sequences(&parent_suffix, branch_snaps));

        let comparison = BranchComparison {
            label_a: "parent".to_string(),
            label_b: branch.id.clone(),
            duration_delta_ms: replay_total_duration_ms(result) - replay_total_duration_ms(&baseline),
            step_count_delta: result.steps.len() as i64 - baseline.steps.len() as i64,
            a_success: baseline.success,
            b_success: result.success,
            sequence_diff,
        };

        branch.comparison = Some(comparison.clone());
        self.branches.write().unwrap().insert(branch.id.clone(), branch);
        Ok(comparison)
    }

    pub fn what_if(
        &self,
        ctx: &Context,
        exec_id: &str,
        seq: u64,
        modification: timewarp_replay::Modification,
    ) -> Result<BranchComparison> {
        let branch = self.create_branch(
            ctx,
            exec_id,
            seq,
            BranchOptions {
                modification: Some(modification),
                mode: Some(ReplayMode::Hybrid),
                ..Default::default()
            },
        )?;
        self.execute_branch(ctx, &branch.id)?;
        self.compare_with_parent(ctx, &branch.id)
    }

    pub async fn what_if_multiple(
        self: &Arc<Self>,
        ctx: &Context,
        exec_id: &str,
        seq: u64,
        modifications: Vec<timewarp_replay::Modification>,
    ) -> (Vec<BranchComparison>, Option<Error>) {
        let tasks: Vec<_> = modifications
            .into_iter()
            .map(|modification| {
                let engine = Arc::clone(self);
                let ctx = ctx.child(None);
                let exec_id = exec_id.to_string();
                tokio::spawn(async move {
                    tokio::task::block_in_place(|| engine.what_if(&ctx, &exec_id, seq, modification))
                })
            })
            .collect();

        let joined = futures::future::join_all(tasks).await;
        let mut comparisons = Vec::new();
        let mut first_error = None;
        for outcome in joined {
            match outcome {
                Ok(Ok(comparison)) => comparisons.push(comparison),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(join_err) => {
                    first_error.get_or_insert(Error::FailedPrecondition(join_err.to_string()));
                }
            }
        }
        (comparisons, first_error)
    }

    pub fn delete_branch(&self, branch_id: &str) -> Result<()> {
        self.branches
            .write()
            .unwrap()
            .remove(branch_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("branch {}", branch_id)))
    }

    pub fn list_branches(&self, exec_id: &str) -> Vec<Branch> {
        let mut out: Vec<Branch> = self
            .branches
            .read()
            .unwrap()
            .values()
            .filter(|b| b.parent_execution_id == exec_id)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.created_at);
        out
    }

    pub fn list_all_branches(&self) -> Vec<Branch> {
        let mut out: Vec<Branch> = self.branches.read().unwrap().values().cloned().collect();
        out.sort_by_key(|b| b.created_at);
        out
    }

    pub fn get_branch_tree(&self, exec_id: &str) -> Vec<BranchTreeNode> {
        let all = self.list_all_branches();
        let roots: Vec<&Branch> = all
            .iter()
            .filter(|b| b.parent_execution_id == exec_id && b.parent_branch_id.is_none())
            .collect();

        fn build(branch: &Branch, all: &[Branch]) -> BranchTreeNode {
            let children = all
                .iter()
                .filter(|b| b.parent_branch_id.as_deref() == Some(branch.id.as_str()))
                .map(|child| build(child, all))
                .collect();
            BranchTreeNode {
                branch: branch.clone(),
                children,
            }
        }

        roots.into_iter().map(|b| build(b, &all)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timewarp_replay::{Modification, ModificationType};
    use timewarp_store::MemoryStore;
    use timewarp_testing::fixtures;

    fn setup() -> (Arc<BranchEngine>, Context) {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        let ctx = Context::background();
        for snap in fixtures::sample_execution("E1") {
            store.save(&ctx, snap).unwrap();
        }
        let replay_engine = Arc::new(ReplayEngine::new(store.clone()));
        (Arc::new(BranchEngine::new(store, replay_engine)), ctx)
    }

    #[test]
    fn create_branch_rejects_an_unknown_sequence() {
        let (engine, ctx) = setup();
        let err = engine.create_branch(&ctx, "E1", 999, BranchOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn what_if_leaves_exactly_one_completed_branch() {
        let (engine, ctx) = setup();
        let modification = Modification::new(ModificationType::ToolResponse, "", serde_json::json!({}));
        engine.what_if(&ctx, "E1", 1, modification).unwrap();

        let branches = engine.list_branches("E1");
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].status, BranchStatus::Completed);
    }

    #[test]
    fn compare_branches_is_symmetric_up_to_sign() {
        let (engine, ctx) = setup();
        let b1 = engine.create_branch(&ctx, "E1", 1, BranchOptions::default()).unwrap();
        let b2 = engine.create_branch(&ctx, "E1", 1, BranchOptions::default()).unwrap();
        engine.execute_branch(&ctx, &b1.id).unwrap();
        engine.execute_branch(&ctx, &b2.id).unwrap();

        let forward = engine.compare_branches(&ctx, &b1.id, &b2.id).unwrap();
        let backward = engine.compare_branches(&ctx, &b2.id, &b1.id).unwrap();
        assert_eq!(forward.duration_delta_ms, -backward.duration_delta_ms);
        assert_eq!(forward.step_count_delta, -backward.step_count_delta);
    }

    #[test]
    fn delete_branch_removes_it_from_the_registry() {
        let (engine, ctx) = setup();
        let branch = engine.create_branch(&ctx, "E1", 1, BranchOptions::default()).unwrap();
        engine.delete_branch(&branch.id).unwrap();
        assert!(engine.get_branch(&branch.id).is_err());
    }

    #[test]
    fn branch_tree_nests_children_under_their_parent() {
        let (engine, ctx) = setup();
        let root = engine.create_branch(&ctx, "E1", 1, BranchOptions::default()).unwrap();
        engine.execute_branch(&ctx, &root.id).unwrap();
        engine
            .create_branch_from_branch(&root.id, 1, BranchOptions::default())
            .unwrap();

        let tree = engine.get_branch_tree("E1");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
    }
}
