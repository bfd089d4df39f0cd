use timewarp_types::{Context, Value};

/// Injected handler for replaying a tool-call step in `execute`/`hybrid` mode.
///
/// Absence (an `Option<Arc<dyn ToolExecutor>>` left `None`) collapses those
/// modes back to `simulate` for tool-call steps.
pub trait ToolExecutor: Send + Sync {
    fn call(&self, ctx: &Context, tool_name: &str, input: &Value) -> Result<Value, String>;
}

/// Injected handler for replaying an LLM-call step in `execute`/`hybrid` mode.
pub trait LLMExecutor: Send + Sync {
    fn call(&self, ctx: &Context, provider: &str, model: &str, input: &Value) -> Result<Value, String>;
}
