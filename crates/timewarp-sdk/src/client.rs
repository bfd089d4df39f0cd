use std::path::Path;
use std::sync::Arc;

use timewarp_branch::{Branch, BranchComparison, BranchEngine, BranchOptions, BranchTreeNode};
use timewarp_engine::{
    reconstruct, ReconstructedState, StateComparison, StateTransition, Timeline, TransitionField,
};
use timewarp_recorder::{Recorder, RecorderConfig};
use timewarp_replay::{LLMExecutor, ReplayEngine, ReplayOptions, ReplayResult, ToolExecutor};
use timewarp_store::{MemoryStore, SnapshotStore, SqlStore};
use timewarp_types::{Context, ExecutionSummary, StoreStats};

use crate::error::{Error, Result};

/// Builds a [`Client`] with optional executors and recorder configuration
/// before it settles on a backing store.
#[derive(Default)]
pub struct ClientBuilder {
    recorder_config: RecorderConfig,
    tool_executor: Option<Arc<dyn ToolExecutor>>,
    llm_executor: Option<Arc<dyn LLMExecutor>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder_config(mut self, config: RecorderConfig) -> Self {
        self.recorder_config = config;
        self
    }

    pub fn tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = Some(executor);
        self
    }

    pub fn llm_executor(mut self, executor: Arc<dyn LLMExecutor>) -> Self {
        self.llm_executor = Some(executor);
        self
    }

    /// Finish the builder over an already-constructed store, e.g. one shared
    /// with another part of the embedding application.
    pub fn build_with_store(self, store: Arc<dyn SnapshotStore>) -> Client {
        let mut replay_engine = ReplayEngine::new(store.clone());
        if let Some(tool) = self.tool_executor {
            replay_engine = replay_engine.with_tool_executor(tool);
        }
        if let Some(llm) = self.llm_executor {
            replay_engine = replay_engine.with_llm_executor(llm);
        }
        let replay_engine = Arc::new(replay_engine);
        let branch_engine = Arc::new(BranchEngine::new(store.clone(), replay_engine.clone()));
        let recorder = Arc::new(Recorder::with_config(store.clone(), self.recorder_config));

        Client {
            store,
            recorder,
            replay_engine,
            branch_engine,
        }
    }

    pub fn build_in_memory(self) -> Client {
        self.build_with_store(Arc::new(MemoryStore::new()))
    }

    pub fn build_sqlite(self, path: impl AsRef<Path>) -> Result<Client> {
        let store: Arc<dyn SnapshotStore> = Arc::new(SqlStore::open(path.as_ref())?);
        Ok(self.build_with_store(store))
    }
}

/// Facade composing the store, recorder, timeline engine, replay engine and
/// branching engine behind one stable surface for embedding applications.
///
/// Cheap to clone: every field is an `Arc`, so a `Client` can be shared
/// across threads the way the [`Recorder`] and [`SnapshotStore`] it wraps
/// already are.
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn SnapshotStore>,
    recorder: Arc<Recorder>,
    replay_engine: Arc<ReplayEngine>,
    branch_engine: Arc<BranchEngine>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Open (creating if absent) a SQLite-backed client at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        ClientBuilder::new().build_sqlite(path)
    }

    /// An in-memory client, for embedding applications that don't need a
    /// durable log (tests, short-lived tooling).
    pub fn open_in_memory() -> Self {
        ClientBuilder::new().build_in_memory()
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub fn branches(&self) -> &Arc<BranchEngine> {
        &self.branch_engine
    }

    /// Load the timeline for one execution.
    pub fn timeline(&self, ctx: &Context, execution_id: &str) -> Result<Timeline> {
        Ok(Timeline::new(ctx, self.store.clone(), execution_id)?)
    }

    /// Rebuild the state as of `sequence` within `execution_id`.
    pub fn reconstruct(
        &self,
        ctx: &Context,
        execution_id: &str,
        sequence: u64,
    ) -> Result<ReconstructedState> {
        let timeline = self.timeline(ctx, execution_id)?;
        reconstruct(&timeline, sequence)
            .ok_or_else(|| Error::NotFound(format!("{execution_id}@{sequence}")))
    }

    /// Compare two points in the same execution's history.
    pub fn compare_states(
        &self,
        ctx: &Context,
        execution_id: &str,
        sequence_a: u64,
        sequence_b: u64,
    ) -> Result<StateComparison> {
        let timeline = self.timeline(ctx, execution_id)?;
        timewarp_engine::compare_states(&timeline, sequence_a, sequence_b)
            .ok_or_else(|| Error::NotFound(format!("{execution_id}@{sequence_a}..{sequence_b}")))
    }

    /// Every point where `field` changed value across the execution.
    pub fn find_state_transitions(
        &self,
        ctx: &Context,
        execution_id: &str,
        field: TransitionField,
    ) -> Result<Vec<StateTransition>> {
        let timeline = self.timeline(ctx, execution_id)?;
        Ok(timewarp_engine::find_state_transitions(&timeline, field))
    }

    /// Replay `execution_id` from `from_sequence` under `options`.
    pub fn replay(
        &self,
        ctx: &Context,
        execution_id: &str,
        from_sequence: u64,
        options: ReplayOptions,
    ) -> Result<ReplayResult> {
        Ok(self
            .replay_engine
            .replay_from(ctx, execution_id, from_sequence, options)?)
    }

    /// Fork a branch at `branch_point_sequence` and run it to completion.
    pub fn what_if(
        &self,
        ctx: &Context,
        execution_id: &str,
        branch_point_sequence: u64,
        options: BranchOptions,
    ) -> Result<Branch> {
        let branch = self
            .branch_engine
            .create_branch(ctx, execution_id, branch_point_sequence, options)?;
        Ok(self.branch_engine.execute_branch(ctx, &branch.id)?)
    }

    pub fn compare_branches(&self, ctx: &Context, a: &str, b: &str) -> Result<BranchComparison> {
        Ok(self.branch_engine.compare_branches(ctx, a, b)?)
    }

    pub fn branch_tree(&self, execution_id: &str) -> Vec<BranchTreeNode> {
        self.branch_engine.get_branch_tree(execution_id)
    }

    pub fn list_executions(
        &self,
        ctx: &Context,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExecutionSummary>> {
        Ok(self.store.list_executions(ctx, limit, offset)?)
    }

    pub fn execution_summary(&self, ctx: &Context, execution_id: &str) -> Result<ExecutionSummary> {
        Ok(self.store.get_execution_summary(ctx, execution_id)?)
    }

    pub fn stats(&self, ctx: &Context) -> Result<StoreStats> {
        Ok(self.store.stats(ctx)?)
    }

    pub fn close(&self) -> Result<()> {
        Ok(self.store.close()?)
    }
}
