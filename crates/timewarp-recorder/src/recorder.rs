use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use timewarp_store::SnapshotStore;
use timewarp_types::{
    canonical_byte_len, ActionSnapshot, Checkpoint, CheckpointKind, Context, ErrorSnapshot,
    ExecutionSnapshot, Value,
};

use crate::config::RecorderConfig;
use crate::error::{Error, Result};

type CheckpointCallback = dyn Fn(&ExecutionSnapshot) + Send + Sync;

/// Holds one current execution context and turns producer-facing
/// [`Checkpoint`]s into persisted [`ExecutionSnapshot`]s.
///
/// A single `Recorder` is meant to be shared (it's `Send + Sync`) across the
/// threads or tasks that make up one agent process; `start_execution` resets
/// the identity it carries for all of them.
pub struct Recorder {
    store: Arc<dyn SnapshotStore>,
    config: RecorderConfig,

    execution_id: RwLock<Option<String>>,
    agent_id: RwLock<Option<String>>,
    counter: AtomicU64,
    enabled: AtomicBool,

    metadata: RwLock<HashMap<String, Value>>,
    disabled_checkpoints: RwLock<std::collections::HashSet<CheckpointKind>>,
    callbacks: RwLock<Vec<Box<CheckpointCallback>>>,
}

impl Recorder {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_config(store, RecorderConfig::default())
    }

    pub fn with_config(store: Arc<dyn SnapshotStore>, config: RecorderConfig) -> Self {
        Self {
            store,
            config,
            execution_id: RwLock::new(None),
            agent_id: RwLock::new(None),
            counter: AtomicU64::new(0),
            enabled: AtomicBool::new(false),
            metadata: RwLock::new(HashMap::new()),
            disabled_checkpoints: RwLock::new(std::collections::HashSet::new()),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Begin a new execution with a freshly generated id. Returns the id.
    pub fn start_execution(&self, agent_id: impl Into<String>) -> String {
        let execution_id = Uuid::new_v4().to_string();
        self.start_execution_with_id(execution_id.clone(), agent_id);
        execution_id
    }

    /// Begin a new execution under an externally chosen id, for correlating
    /// with an id minted elsewhere.
    pub fn start_execution_with_id(&self, execution_id: impl Into<String>, agent_id: impl Into<String>) {
        *self.execution_id.write().unwrap() = Some(execution_id.into());
        *self.agent_id.write().unwrap() = Some(agent_id.into());
        self.counter.store(0, Ordering::SeqCst);
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Stop recording. Does not persist a terminal snapshot — callers record
    /// the appropriate task-lifecycle checkpoint themselves before calling
    /// this.
    pub fn end_execution(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn current_execution_id(&self) -> Option<String> {
        self.execution_id.read().unwrap().clone()
    }

    /// Merge `metadata` into every subsequent checkpoint for the current
    /// execution. Checkpoint-level metadata wins on key collision.
    pub fn set_execution_metadata(&self, key: impl Into<String>, value: Value) {
        self.metadata.write().unwrap().insert(key.into(), value);
    }

    /// Disable (or re-enable) one checkpoint kind entirely, regardless of
    /// sampling.
    pub fn set_checkpoint_enabled(&self, kind: CheckpointKind, enabled: bool) {
        let mut disabled = self.disabled_checkpoints.write().unwrap();
        if enabled {
            disabled.remove(&kind);
        } else {
            disabled.insert(kind);
        }
    }

    /// Register a callback invoked synchronously after every successful
    /// persist. A panic inside `callback` is caught and logged, never
    /// propagated.
    pub fn on_checkpoint(&self, callback: impl Fn(&ExecutionSnapshot) + Send + Sync + 'static) {
        self.callbacks.write().unwrap().push(Box::new(callback));
    }

    /// Core record operation. Returns `Ok(None)` for a no-op: the
    /// recorder is disabled, the checkpoint was sampled out, or its kind is
    /// disabled.
    pub fn record(&self, ctx: &Context, checkpoint: Checkpoint) -> Result<Option<ExecutionSnapshot>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let checkpoint_type = checkpoint
            .checkpoint_type
            .ok_or_else(|| Error::InvalidConfig("checkpoint is missing a checkpoint_type".to_string()))?;

        let current_count = self.counter.load(Ordering::SeqCst);
        if self.config.sample_rate < 1.0 && !Self::sampled_in(current_count, self.config.sample_rate) {
            return Ok(None);
        }

        if self.disabled_checkpoints.read().unwrap().contains(&checkpoint_type) {
            return Ok(None);
        }

        let execution_id = self
            .execution_id
            .read()
            .unwrap()
            .clone()
            .ok_or(Error::NoActiveExecution)?;
        let default_agent_id = self.agent_id.read().unwrap().clone();

        let sequence_num = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        let mut metadata = self.metadata.read().unwrap().clone();
        metadata.extend(checkpoint.metadata);

        let snapshot = ExecutionSnapshot {
            id: Uuid::nil(),
            execution_id,
            sequence_num,
            timestamp: Utc::now(),
            checkpoint_type,
            agent_id: checkpoint.agent_id.or(default_agent_id),
            task_id: checkpoint.task_id,
            worker_id: checkpoint.worker_id,
            session_id: checkpoint.session_id,
            trace_id: checkpoint.trace_id,
            span_id: checkpoint.span_id,
            parent_span_id: checkpoint.parent_span_id,
            session_state: if self.config.capture_session_state {
                checkpoint.session_state
            } else {
                None
            },
            task_state: if self.config.capture_task_state {
                checkpoint.task_state
            } else {
                None
            },
            workspace_state: if self.config.capture_workspace {
                checkpoint.workspace_state
            } else {
                None
            },
            action: checkpoint.action.map(|a| self.project_action(a)),
            input: if self.config.capture_input_output {
                checkpoint.input.map(|v| self.truncate(v, self.config.max_input_size))
            } else {
                None
            },
            output: if self.config.capture_input_output {
                checkpoint.output.map(|v| self.truncate(v, self.config.max_output_size))
            } else {
                None
            },
            error: checkpoint.error,
            metadata,
        };

        let saved = self.store.save(ctx, snapshot)?;
        self.notify(&saved);
        Ok(Some(saved))
    }

    /// Deterministic sample predicate: replaying the same source with the
    /// same rate yields the same sampled subset (faithful port
    /// of the non-uniform prefix scheme).
    fn sampled_in(counter: u64, rate: f64) -> bool {
        ((counter % 100) as f64) / 100.0 < rate
    }

    fn project_action(&self, mut action: ActionSnapshot) -> ActionSnapshot {
        if !self.config.capture_full_llm_context
            && action.kind == timewarp_types::ActionKind::LlmCall
        {
            action.input = None;
            action.output = None;
        }
        action
    }

    fn truncate(&self, value: Value, max_size: usize) -> Value {
        let size = canonical_byte_len(&value);
        if size <= max_size {
            return value;
        }
        serde_json::json!({
            "__truncated__": true,
            "original_bytes": size,
        })
    }

    fn notify(&self, snapshot: &ExecutionSnapshot) {
        for callback in self.callbacks.read().unwrap().iter() {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "checkpoint callback panicked".to_string());
                log::warn!("checkpoint callback panicked: {msg}");
            }
        }
    }

    // --- Convenience helpers ---

    pub fn task_created(&self, ctx: &Context, task_id: impl Into<String>) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::TaskCreated).with_task_id(task_id))
    }

    pub fn task_started(&self, ctx: &Context, task_id: impl Into<String>) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::TaskStarted).with_task_id(task_id))
    }

    pub fn task_completed(
        &self,
        ctx: &Context,
        task_id: impl Into<String>,
        output: Option<Value>,
    ) -> Result<Option<ExecutionSnapshot>> {
        let mut cp = Checkpoint::new(CheckpointKind::TaskCompleted).with_task_id(task_id);
        if let Some(output) = output {
            cp = cp.with_output(output);
        }
        self.record(ctx, cp)
    }

    pub fn task_failed(
        &self,
        ctx: &Context,
        task_id: impl Into<String>,
        error: ErrorSnapshot,
    ) -> Result<Option<ExecutionSnapshot>> {
        self.record(
            ctx,
            Checkpoint::new(CheckpointKind::TaskFailed)
                .with_task_id(task_id)
                .with_error(error),
        )
    }

    pub fn tool_call_start(&self, ctx: &Context, action: ActionSnapshot) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::ToolCallStart).with_action(action))
    }

    pub fn tool_call_end(&self, ctx: &Context, action: ActionSnapshot) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::ToolCallEnd).with_action(action))
    }

    pub fn llm_call_start(&self, ctx: &Context, action: ActionSnapshot) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::LlmCallStart).with_action(action))
    }

    pub fn llm_call_end(&self, ctx: &Context, action: ActionSnapshot) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::LlmCallEnd).with_action(action))
    }

    pub fn agent_step(&self, ctx: &Context, metadata: HashMap<String, Value>) -> Result<Option<ExecutionSnapshot>> {
        let mut cp = Checkpoint::new(CheckpointKind::AgentStep);
        cp.metadata = metadata;
        self.record(ctx, cp)
    }

    pub fn decision_point(&self, ctx: &Context, input: Value, output: Value) -> Result<Option<ExecutionSnapshot>> {
        self.record(
            ctx,
            Checkpoint::new(CheckpointKind::DecisionPoint)
                .with_input(input)
                .with_output(output),
        )
    }

    pub fn message_sent(&self, ctx: &Context, message: Value) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::MessageSent).with_output(message))
    }

    pub fn message_received(&self, ctx: &Context, message: Value) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::MessageReceived).with_input(message))
    }

    pub fn error(&self, ctx: &Context, error: ErrorSnapshot) -> Result<Option<ExecutionSnapshot>> {
        self.record(ctx, Checkpoint::new(CheckpointKind::Error).with_error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use timewarp_store::MemoryStore;

    fn recorder() -> Recorder {
        Recorder::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn record_before_start_execution_errors() {
        let rec = recorder();
        rec.enabled.store(true, Ordering::SeqCst); // bypass disabled no-op to hit the real guard
        let ctx = Context::background();
        let result = rec.record(&ctx, Checkpoint::new(CheckpointKind::AgentStep));
        assert!(matches!(result, Err(Error::NoActiveExecution)));
    }

    #[test]
    fn record_before_start_is_a_noop_by_default() {
        let rec = recorder();
        let ctx = Context::background();
        let result = rec.record(&ctx, Checkpoint::new(CheckpointKind::AgentStep)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn sequence_increments_per_recorded_snapshot() {
        let rec = recorder();
        let ctx = Context::background();
        rec.start_execution("agent-1");

        let first = rec.task_created(&ctx, "task-1").unwrap().unwrap();
        let second = rec.task_started(&ctx, "task-1").unwrap().unwrap();

        assert_eq!(first.sequence_num, 1);
        assert_eq!(second.sequence_num, 2);
        assert_eq!(first.execution_id, second.execution_id);
    }

    #[test]
    fn end_execution_makes_subsequent_records_a_noop() {
        let rec = recorder();
        let ctx = Context::background();
        rec.start_execution("agent-1");
        rec.end_execution();

        let result = rec.task_created(&ctx, "task-1").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn disabled_checkpoint_kind_is_skipped() {
        let rec = recorder();
        let ctx = Context::background();
        rec.start_execution("agent-1");
        rec.set_checkpoint_enabled(CheckpointKind::AgentStep, false);

        let result = rec.agent_step(&ctx, HashMap::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn zero_sample_rate_records_nothing() {
        let mut config = RecorderConfig::default();
        config.sample_rate = 0.0;
        let rec = Recorder::with_config(Arc::new(MemoryStore::new()), config);
        let ctx = Context::background();
        rec.start_execution("agent-1");

        assert!(rec.task_created(&ctx, "task-1").unwrap().is_none());
    }

    #[test]
    fn oversized_input_is_replaced_with_truncation_marker() {
        let mut config = RecorderConfig::default();
        config.max_input_size = 8;
        let rec = Recorder::with_config(Arc::new(MemoryStore::new()), config);
        let ctx = Context::background();
        rec.start_execution("agent-1");

        let big = serde_json::json!("this string is definitely longer than eight bytes");
        let snap = rec
            .record(&ctx, Checkpoint::new(CheckpointKind::AgentStep).with_input(big))
            .unwrap()
            .unwrap();

        assert_eq!(snap.input.unwrap()["__truncated__"], serde_json::json!(true));
    }

    #[test]
    fn callback_panic_does_not_propagate() {
        let rec = recorder();
        let ctx = Context::background();
        rec.start_execution("agent-1");

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        rec.on_checkpoint(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            panic!("boom");
        });

        let result = rec.task_created(&ctx, "task-1");
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn execution_metadata_merges_with_checkpoint_metadata() {
        let rec = recorder();
        let ctx = Context::background();
        rec.start_execution("agent-1");
        rec.set_execution_metadata("run", serde_json::json!("nightly"));

        let mut cp = Checkpoint::new(CheckpointKind::AgentStep);
        cp.metadata.insert("step".to_string(), serde_json::json!(1));
        let snap = rec.record(&ctx, cp).unwrap().unwrap();

        assert_eq!(snap.metadata.get("run"), Some(&serde_json::json!("nightly")));
        assert_eq!(snap.metadata.get("step"), Some(&serde_json::json!(1)));
    }
}
