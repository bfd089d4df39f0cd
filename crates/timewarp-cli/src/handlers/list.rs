use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output;

pub fn handle(ctx: &ExecutionContext, limit: usize, offset: usize, format: OutputFormat) -> Result<()> {
    let summaries = ctx.client.list_executions(&ctx.ctx, limit, offset)?;

    output::render(format, &summaries, || {
        if summaries.is_empty() {
            println!("{}", output::dim("no executions recorded"));
            return;
        }
        println!(
            "{:<36}  {:<10}  {:>6}  {:>6}  START",
            output::heading("EXECUTION"),
            output::heading("STATUS"),
            output::heading("STEPS"),
            output::heading("ERRS"),
        );
        for summary in &summaries {
            let status = format!("{:?}", summary.status).to_lowercase();
            let status = match status.as_str() {
                "failed" => output::bad(&status),
                "completed" => output::good(&status),
                _ => status,
            };
            println!(
                "{:<36}  {:<10}  {:>6}  {:>6}  {}",
                summary.execution_id,
                status,
                summary.total_steps,
                summary.error_count,
                summary.start_time,
            );
        }
    });

    Ok(())
}
