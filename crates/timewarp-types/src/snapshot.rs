use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkpoint::CheckpointKind;
use crate::value::Value;

/// Status of a recorded session projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Idle,
    Completed,
    Failed,
}

/// Point-in-time projection of session state, captured on a subset of snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub status: SessionStatus,
    /// Ordered message history as of this capture. History only grows over
    /// the life of a session (see `SessionDiff::messages_added`).
    pub messages: Vec<Value>,
    /// Mapping of workspace keys this session is aware of at capture time.
    pub workspace: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a recorded task projection, aligned with the task lifecycle
/// checkpoint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Assigned,
    Started,
    Completed,
    Failed,
    Retrying,
}

/// Point-in-time projection of task state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub id: String,
    pub name: String,
    pub task_type: String,
    pub priority: Option<i32>,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub creator: Option<String>,
    pub depends_on: Vec<String>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<String>,
}

/// Partial overlay of workspace key/value pairs written since the previous
/// workspace snapshot. Reconstruction merges these in sequence order.
pub type WorkspaceState = HashMap<String, Value>;

/// Discriminates the kind of action an `ActionSnapshot` captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ToolCall,
    LlmCall,
    Decision,
    Message,
}

/// Captured detail of one tool call, LLM call, decision or message action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub kind: ActionKind,
    pub name: String,
    pub input: Option<Value>,
    pub output: Option<Value>,
    /// Wall-clock duration of the action, in milliseconds.
    pub duration_ms: Option<i64>,
    pub success: bool,

    // Action-kind-specific fields; populated only for the matching kind.
    pub model: Option<String>,
    pub provider: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost: Option<f64>,
    pub tool_name: Option<String>,
}

impl ActionSnapshot {
    pub fn tool_call(name: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::ToolCall,
            name: name.into(),
            input: None,
            output: None,
            duration_ms: None,
            success: true,
            model: None,
            provider: None,
            input_tokens: None,
            output_tokens: None,
            cost: None,
            tool_name: None,
        }
    }

    pub fn llm_call(name: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::LlmCall,
            name: name.into(),
            input: None,
            output: None,
            duration_ms: None,
            success: true,
            model: None,
            provider: None,
            input_tokens: None,
            output_tokens: None,
            cost: None,
            tool_name: None,
        }
    }
}

/// Captured detail of an error observed during an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSnapshot {
    pub kind: String,
    pub message: String,
    pub code: Option<String>,
    pub stack: Option<String>,
    pub cause: Option<String>,
    pub retryable: bool,
}

impl ErrorSnapshot {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            code: None,
            stack: None,
            cause: None,
            retryable: false,
        }
    }
}

/// The immutable, atomic record persisted by the snapshot store.
///
/// `sequence_num` is unique and monotonic within `execution_id`; together
/// they form the store's primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub id: Uuid,
    pub execution_id: String,
    pub sequence_num: u64,
    pub timestamp: DateTime<Utc>,
    pub checkpoint_type: CheckpointKind,

    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub worker_id: Option<String>,
    pub session_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,

    pub session_state: Option<SessionState>,
    pub task_state: Option<TaskState>,
    pub workspace_state: Option<WorkspaceState>,
    pub action: Option<ActionSnapshot>,

    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<ErrorSnapshot>,

    pub metadata: HashMap<String, Value>,
}

impl ExecutionSnapshot {
    pub fn has_error(&self) -> bool {
        self.error.is_some() || self.checkpoint_type == CheckpointKind::Error
    }
}

/// Producer-facing checkpoint: carries only the fields the caller knows.
/// The recorder fills in ordering, timestamps and carried identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_type: Option<CheckpointKind>,

    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub worker_id: Option<String>,
    pub session_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,

    pub session_state: Option<SessionState>,
    pub task_state: Option<TaskState>,
    pub workspace_state: Option<WorkspaceState>,
    pub action: Option<ActionSnapshot>,

    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<ErrorSnapshot>,

    pub metadata: HashMap<String, Value>,
}

impl Checkpoint {
    pub fn new(checkpoint_type: CheckpointKind) -> Self {
        Self {
            checkpoint_type: Some(checkpoint_type),
            ..Default::default()
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_action(mut self, action: ActionSnapshot) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_error(mut self, error: ErrorSnapshot) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_builder_is_fluent() {
        let cp = Checkpoint::new(CheckpointKind::ToolCallEnd)
            .with_task_id("t1")
            .with_output(serde_json::json!({"ok": true}));
        assert_eq!(cp.task_id.as_deref(), Some("t1"));
        assert_eq!(cp.checkpoint_type, Some(CheckpointKind::ToolCallEnd));
    }

    #[test]
    fn snapshot_has_error_covers_both_sources() {
        let mut snap = sample_snapshot();
        assert!(!snap.has_error());
        snap.error = Some(ErrorSnapshot::new("Timeout", "took too long"));
        assert!(snap.has_error());
    }

    fn sample_snapshot() -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: Uuid::new_v4(),
            execution_id: "E1".to_string(),
            sequence_num: 1,
            timestamp: Utc::now(),
            checkpoint_type: CheckpointKind::TaskStarted,
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
            error: None,
            metadata: HashMap::new(),
        }
    }
}
