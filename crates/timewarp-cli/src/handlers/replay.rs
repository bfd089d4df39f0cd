use anyhow::Result;
use timewarp_sdk::{ReplayMode, ReplayOptions};

use crate::args::{OutputFormat, ReplayModeArg};
use crate::context::ExecutionContext;
use crate::output;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    ctx: &ExecutionContext,
    execution_id: &str,
    from_sequence: u64,
    mode: ReplayModeArg,
    max_steps: Option<u64>,
    stop_at_sequence: Option<u64>,
    compare_with_original: bool,
    format: OutputFormat,
) -> Result<()> {
    let options = ReplayOptions {
        mode: to_replay_mode(mode),
        modification: None,
        max_steps,
        stop_at_sequence,
        stop_at_checkpoint: None,
        timeout: None,
        compare_with_original,
    };

    let result = ctx.client.replay(&ctx.ctx, execution_id, from_sequence, options)?;

    output::render(format, &result, || {
        println!(
            "{} {} -> {} ({:?})",
            output::heading("replay"),
            result.source_execution_id,
            result.replay_execution_id,
            result.mode,
        );
        println!("  steps:      {}", result.steps_replayed());
        println!("  tool calls: {}", result.tool_calls);
        println!("  llm calls:  {}", result.llm_calls);
        println!("  stop:       {:?}", result.stop_reason);
        println!(
            "  result:     {}",
            if result.success { output::good("success") } else { output::bad("failed") }
        );
        if !result.differences.is_empty() {
            println!("  differences ({}):", result.differences.len());
            for diff in &result.differences {
                println!("    seq {} {}: {}", diff.sequence, diff.path, diff.diff_type);
            }
        }
    });

    Ok(())
}

fn to_replay_mode(mode: ReplayModeArg) -> ReplayMode {
    match mode {
        ReplayModeArg::Simulate => ReplayMode::Simulate,
        ReplayModeArg::Execute => ReplayMode::Execute,
        ReplayModeArg::Hybrid => ReplayMode::Hybrid,
    }
}
