use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use timewarp_engine::Timeline;
use timewarp_store::SnapshotStore;
use timewarp_types::{CheckpointKind, Context, ExecutionSnapshot, Value};

use crate::error::Result;
use crate::executors::{LLMExecutor, ToolExecutor};
use crate::types::{
    Modification, ReplayMode, ReplayOptions, ReplayResult, ReplayStep, StateDifference, StopReason,
};

fn set_path(value: &mut Value, segments: &[&str], new_value: Value) {
    if segments.is_empty() {
        return;
    }
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }
    let obj = value.as_object_mut().expect("just normalized to an object");
    if segments.len() == 1 {
        obj.insert(segments[0].to_string(), new_value);
    } else {
        let entry = obj
            .entry(segments[0].to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        set_path(entry, &segments[1..], new_value);
    }
}

fn apply_modification(base: Option<&Value>, modification: &Modification) -> Value {
    if modification.path.is_empty() {
        return modification.value.clone();
    }
    let mut root = base.cloned().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let segments: Vec<&str> = modification.path.split('.').collect();
    set_path(&mut root, &segments, modification.value.clone());
    root
}

/// Walks a suffix of a recorded timeline under a selected mode, simulating
/// recorded output or routing through injected executors.
pub struct ReplayEngine {
    pub(crate) store: Arc<dyn SnapshotStore>,
    tool_executor: Option<Arc<dyn ToolExecutor>>,
    llm_executor: Option<Arc<dyn LLMExecutor>>,
}

impl ReplayEngine {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            tool_executor: None,
            llm_executor: None,
        }
    }

    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = Some(executor);
        self
    }

    pub fn with_llm_executor(mut self, executor: Arc<dyn LLMExecutor>) -> Self {
        self.llm_executor = Some(executor);
        self
    }

    /// Replay the snapshot suffix of `execution_id` starting at `seq`.
    pub fn replay_from(
        &self,
        ctx: &Context,
        execution_id: &str,
        seq: u64,
        options: ReplayOptions,
    ) -> Result<ReplayResult> {
        let timeline = Timeline::new(ctx, self.store.clone(), execution_id)?;
        let suffix: Vec<ExecutionSnapshot> = timeline
            .snapshots()
            .iter()
            .filter(|s| s.sequence_num >= seq)
            .cloned()
            .collect();

        let replay_execution_id = Uuid::new_v4().to_string();
        let mut steps = Vec::new();
        let mut differences = Vec::new();
        let mut tool_calls = 0u64;
        let mut llm_calls = 0u64;
        let mut stop_reason = StopReason::EndOfTimeline;

        let run_ctx = match options.timeout {
            Some(timeout) => ctx.child(Some(timeout)),
            None => ctx.child(None),
        };

        for snap in &suffix {
            if run_ctx.is_cancelled() {
                stop_reason = StopReason::Timeout;
                break;
            }
            if let Some(max_steps) = options.max_steps {
                if steps.len() as u64 >= max_steps {
                    stop_reason = StopReason::MaxSteps;
                    break;
                }
            }
            if let Some(stop_seq) = options.stop_at_sequence {
                if snap.sequence_num >= stop_seq {
                    stop_reason = StopReason::Sequence;
                    break;
                }
            }
            if let Some(stop_kind) = options.stop_at_checkpoint {
                if snap.checkpoint_type == stop_kind {
                    stop_reason = StopReason::Checkpoint;
                    break;
                }
            }

            let step = self.execute_step(&run_ctx, snap, &options);

            if snap.checkpoint_type.is_tool_call() {
                tool_calls += 1;
            }
            if snap.checkpoint_type.is_llm_call() {
                llm_calls += 1;
            }

            if options.compare_with_original {
                let recorded_output = snap
                    .output
                    .clone()
                    .or_else(|| snap.action.as_ref().and_then(|a| a.output.clone()));
                if !step.simulated && recorded_output != step.output {
                    differences.push(StateDifference {
                        sequence: step.sequence,
                        path: "output".to_string(),
                        original: recorded_output,
                        replayed: step.output.clone(),
                        diff_type: "changed".to_string(),
                    });
                }
            }

            let step_errored = step.error.is_some();
            steps.push(step);
            if step_errored {
                stop_reason = StopReason::Error;
                break;
            }
        }

        Ok(ReplayResult {
            replay_execution_id,
            source_execution_id: execution_id.to_string(),
            start_sequence: seq,
            mode: options.mode,
            steps,
            differences,
            tool_calls,
            llm_calls,
            stop_reason,
            success: stop_reason != StopReason::Error,
        })
    }

    /// Execute one snapshot's step under `options`. Shared with `ReplayWalker`
    /// so interactive stepping and the batch walk behave identically.
    pub(crate) fn execute_step(
        &self,
        ctx: &Context,
        snap: &ExecutionSnapshot,
        options: &ReplayOptions,
    ) -> ReplayStep {
        let start = Instant::now();
        let kind = snap.checkpoint_type;

        let recorded_input = snap
            .input
            .clone()
            .or_else(|| snap.action.as_ref().and_then(|a| a.input.clone()));
        let recorded_output = snap
            .output
            .clone()
            .or_else(|| snap.action.as_ref().and_then(|a| a.output.clone()));

        let modified = options
            .modification
            .as_ref()
            .map(|m| m.applies_to(kind))
            .unwrap_or(false);

        let effective_input = if modified {
            Some(apply_modification(
                recorded_input.as_ref(),
                options.modification.as_ref().expect("modified implies Some"),
            ))
        } else {
            recorded_input.clone()
        };

        let should_execute = match options.mode {
            ReplayMode::Simulate => false,
            ReplayMode::Execute => true,
            ReplayMode::Hybrid => modified,
        };

        let (output, simulated, error) = if should_execute && kind.is_tool_call() {
            match &self.tool_executor {
                Some(executor) => {
                    let tool_name = snap
                        .action
                        .as_ref()
                        .and_then(|a| a.tool_name.clone().or(Some(a.name.clone())))
                        .unwrap_or_default();
                    let input_val = effective_input.clone().unwrap_or(Value::Null);
                    match executor.call(ctx, &tool_name, &input_val) {
                        Ok(out) => (Some(out), false, None),
                        Err(msg) => (recorded_output.clone(), true, Some(msg)),
                    }
                }
                None => (recorded_output.clone(), true, None),
            }
        } else if should_execute && kind.is_llm_call() {
            match &self.llm_executor {
                Some(executor) => {
                    let provider = snap
                        .action
                        .as_ref()
                        .and_then(|a| a.provider.clone())
                        .unwrap_or_default();
                    let model = snap
                        .action
                        .as_ref()
                        .and_then(|a| a.model.clone())
                        .unwrap_or_default();
                    let input_val = effective_input.clone().unwrap_or(Value::Null);
                    match executor.call(ctx, &provider, &model, &input_val) {
                        Ok(out) => (Some(out), false, None),
                        Err(msg) => (recorded_output.clone(), true, Some(msg)),
                    }
                }
                None => (recorded_output.clone(), true, None),
            }
        } else {
            (recorded_output.clone(), true, None)
        };

        ReplayStep {
            sequence: snap.sequence_num,
            checkpoint_type: kind,
            input: effective_input,
            output,
            duration_ms: start.elapsed().as_millis() as i64,
            simulated,
            modified,
            error,
        }
    }
}

/// Interactive variant of [`ReplayEngine`] that advances one step at a time,
/// driven by operator-invoked `next`/`previous`/`jump_to`. Executed steps are
/// cached so revisiting a position never re-executes it.
pub struct ReplayWalker {
    engine: ReplayEngine,
    suffix: Vec<ExecutionSnapshot>,
    options: ReplayOptions,
    executed: Vec<Option<ReplayStep>>,
    position: usize,
}

impl ReplayWalker {
    pub fn new(
        ctx: &Context,
        engine: ReplayEngine,
        execution_id: impl Into<String>,
        start_sequence: u64,
        options: ReplayOptions,
    ) -> Result<Self> {
        let execution_id = execution_id.into();
        let timeline = Timeline::new(ctx, engine.store.clone(), execution_id)?;
        let suffix: Vec<ExecutionSnapshot> = timeline
            .snapshots()
            .iter()
            .filter(|s| s.sequence_num >= start_sequence)
            .cloned()
            .collect();
        let len = suffix.len();
        Ok(Self {
            engine,
            suffix,
            options,
            executed: vec![None; len],
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.suffix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffix.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.suffix.len()
    }

    pub fn next(&mut self, ctx: &Context) -> Option<&ReplayStep> {
        if self.position >= self.suffix.len() {
            return None;
        }
        self.ensure_executed(ctx, self.position);
        let idx = self.position;
        self.position += 1;
        self.executed[idx].as_ref()
    }

    pub fn previous(&mut self) -> Option<&ReplayStep> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.executed[self.position].as_ref()
    }

    pub fn jump_to(&mut self, ctx: &Context, sequence: u64) -> Option<&ReplayStep> {
        let idx = self.suffix.iter().position(|s| s.sequence_num == sequence)?;
        self.ensure_executed(ctx, idx);
        self.position = idx + 1;
        self.executed[idx].as_ref()
    }

    fn ensure_executed(&mut self, ctx: &Context, index: usize) {
        if self.executed[index].is_none() {
            let step = self.engine.execute_step(ctx, &self.suffix[index], &self.options);
            self.executed[index] = Some(step);
        }
    }
}
