use serde::{Deserialize, Serialize};

/// Closed set of checkpoint kinds a snapshot can classify as.
///
/// Grouped by the lifecycle they describe: task lifecycle, tool calls, LLM
/// calls, agent-internal steps, state projections, communication and user
/// I/O, plus a catch-all `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    TaskCreated,
    TaskAssigned,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskRetry,

    ToolCallStart,
    ToolCallEnd,

    LlmCallStart,
    LlmCallEnd,

    AgentStep,
    AgentPlan,
    AgentAction,
    DecisionPoint,

    StateChange,
    SessionUpdate,
    WorkspaceUpdate,

    MessageSent,
    MessageReceived,

    UserInput,
    UserOutput,

    Error,
}

impl CheckpointKind {
    /// The string tag used on the wire (and as SQL/JSON map keys) — identical
    /// to the `#[serde(rename_all = "snake_case")]` encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKind::TaskCreated => "task_created",
            CheckpointKind::TaskAssigned => "task_assigned",
            CheckpointKind::TaskStarted => "task_started",
            CheckpointKind::TaskCompleted => "task_completed",
            CheckpointKind::TaskFailed => "task_failed",
            CheckpointKind::TaskRetry => "task_retry",
            CheckpointKind::ToolCallStart => "tool_call_start",
            CheckpointKind::ToolCallEnd => "tool_call_end",
            CheckpointKind::LlmCallStart => "llm_call_start",
            CheckpointKind::LlmCallEnd => "llm_call_end",
            CheckpointKind::AgentStep => "agent_step",
            CheckpointKind::AgentPlan => "agent_plan",
            CheckpointKind::AgentAction => "agent_action",
            CheckpointKind::DecisionPoint => "decision_point",
            CheckpointKind::StateChange => "state_change",
            CheckpointKind::SessionUpdate => "session_update",
            CheckpointKind::WorkspaceUpdate => "workspace_update",
            CheckpointKind::MessageSent => "message_sent",
            CheckpointKind::MessageReceived => "message_received",
            CheckpointKind::UserInput => "user_input",
            CheckpointKind::UserOutput => "user_output",
            CheckpointKind::Error => "error",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "task_created" => CheckpointKind::TaskCreated,
            "task_assigned" => CheckpointKind::TaskAssigned,
            "task_started" => CheckpointKind::TaskStarted,
            "task_completed" => CheckpointKind::TaskCompleted,
            "task_failed" => CheckpointKind::TaskFailed,
            "task_retry" => CheckpointKind::TaskRetry,
            "tool_call_start" => CheckpointKind::ToolCallStart,
            "tool_call_end" => CheckpointKind::ToolCallEnd,
            "llm_call_start" => CheckpointKind::LlmCallStart,
            "llm_call_end" => CheckpointKind::LlmCallEnd,
            "agent_step" => CheckpointKind::AgentStep,
            "agent_plan" => CheckpointKind::AgentPlan,
            "agent_action" => CheckpointKind::AgentAction,
            "decision_point" => CheckpointKind::DecisionPoint,
            "state_change" => CheckpointKind::StateChange,
            "session_update" => CheckpointKind::SessionUpdate,
            "workspace_update" => CheckpointKind::WorkspaceUpdate,
            "message_sent" => CheckpointKind::MessageSent,
            "message_received" => CheckpointKind::MessageReceived,
            "user_input" => CheckpointKind::UserInput,
            "user_output" => CheckpointKind::UserOutput,
            "error" => CheckpointKind::Error,
            _ => return None,
        })
    }

    pub fn is_task_lifecycle(&self) -> bool {
        matches!(
            self,
            CheckpointKind::TaskCreated
                | CheckpointKind::TaskAssigned
                | CheckpointKind::TaskStarted
                | CheckpointKind::TaskCompleted
                | CheckpointKind::TaskFailed
                | CheckpointKind::TaskRetry
        )
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, CheckpointKind::ToolCallStart | CheckpointKind::ToolCallEnd)
    }

    pub fn is_llm_call(&self) -> bool {
        matches!(self, CheckpointKind::LlmCallStart | CheckpointKind::LlmCallEnd)
    }
}

impl std::fmt::Display for CheckpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        for kind in [
            CheckpointKind::TaskCreated,
            CheckpointKind::ToolCallEnd,
            CheckpointKind::DecisionPoint,
            CheckpointKind::Error,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            let back: CheckpointKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }

    #[test]
    fn from_str_opt_matches_as_str() {
        assert_eq!(
            CheckpointKind::from_str_opt("tool_call_start"),
            Some(CheckpointKind::ToolCallStart)
        );
        assert_eq!(CheckpointKind::from_str_opt("bogus"), None);
    }
}
