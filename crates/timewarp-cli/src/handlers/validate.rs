use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output;

pub fn handle(ctx: &ExecutionContext, execution_id: &str, format: OutputFormat) -> Result<()> {
    let timeline = ctx.client.timeline(&ctx.ctx, execution_id)?;
    let report = timeline.validate();

    output::render(format, &report, || {
        if report.is_clean() {
            println!("{}", output::good("clean — no invariant violations"));
            return;
        }
        for issue in &report.issues {
            println!("{} {:?}", output::bad("issue"), issue);
        }
    });

    if !report.is_clean() {
        anyhow::bail!("{} invariant violation(s) found", report.issues.len());
    }

    Ok(())
}
