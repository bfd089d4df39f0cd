use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output;

pub fn handle(
    ctx: &ExecutionContext,
    execution_id: &str,
    from: Option<u64>,
    to: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let timeline = ctx.client.timeline(&ctx.ctx, execution_id)?;

    let snapshots: Vec<_> = match (from, to) {
        (Some(from), Some(to)) => timeline.range_by_sequence(from, to),
        (Some(from), None) => timeline
            .snapshots()
            .iter()
            .filter(|s| s.sequence_num >= from)
            .collect(),
        (None, Some(to)) => timeline
            .snapshots()
            .iter()
            .filter(|s| s.sequence_num <= to)
            .collect(),
        (None, None) => timeline.snapshots().iter().collect(),
    };

    output::render(format, &snapshots, || {
        for snap in &snapshots {
            let marker = if snap.has_error() { output::bad("err") } else { "   ".to_string() };
            println!(
                "{:>6}  {:<18}  {}  {}",
                snap.sequence_num,
                snap.checkpoint_type.as_str(),
                snap.timestamp,
                marker,
            );
        }
    });

    Ok(())
}
