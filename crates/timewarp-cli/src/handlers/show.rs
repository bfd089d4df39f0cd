use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output;

pub fn handle(ctx: &ExecutionContext, execution_id: &str, format: OutputFormat) -> Result<()> {
    let summary = ctx.client.execution_summary(&ctx.ctx, execution_id)?;

    output::render(format, &summary, || {
        println!("{} {}", output::heading("execution"), summary.execution_id);
        println!("  agent:     {}", summary.agent_id.as_deref().unwrap_or("-"));
        println!("  status:    {:?}", summary.status);
        println!("  steps:     {}", summary.total_steps);
        println!("  errors:    {}", summary.error_count);
        println!("  start:     {}", summary.start_time);
        println!("  end:       {}", summary.end_time);
        println!("  duration:  {}ms", summary.duration_ms);
        if !summary.checkpoint_counts.is_empty() {
            println!("  checkpoints:");
            let mut counts: Vec<_> = summary.checkpoint_counts.iter().collect();
            counts.sort_by_key(|(kind, _)| kind.as_str());
            for (kind, count) in counts {
                println!("    {:<16} {}", kind.as_str(), count);
            }
        }
        if let Some(error) = &summary.final_error {
            println!("  {}: {}", output::bad("final error"), error.message);
        }
    });

    Ok(())
}
