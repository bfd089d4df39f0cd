use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output;

pub fn handle(ctx: &ExecutionContext, execution_id: &str, sequence: u64, format: OutputFormat) -> Result<()> {
    let state = ctx.client.reconstruct(&ctx.ctx, execution_id, sequence)?;

    output::render(format, &state, || {
        println!("{} {}@{}", output::heading("state"), state.execution_id, state.sequence);
        println!("  timestamp: {}", state.timestamp);
        println!("  agent:     {}", state.agent_id.as_deref().unwrap_or("-"));
        println!("  task:      {}", state.task_id.as_deref().unwrap_or("-"));
        if let Some(task) = &state.task {
            println!("  task status: {:?}", task.status);
        }
        if let Some(session) = &state.session {
            println!("  session status: {:?}", session.status);
        }
        println!("  workspace keys: {}", state.workspace.len());
        println!("  actions so far: {}", state.previous_actions.len());
        println!("  errors so far:  {}", state.error_history.len());
    });

    Ok(())
}
