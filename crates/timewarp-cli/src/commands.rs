use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::context::ExecutionContext;
use crate::handlers;

pub fn run(cli: Cli) -> Result<()> {
    let ctx = ExecutionContext::open(cli.data_path.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::List { limit, offset } => handlers::list::handle(&ctx, limit, offset, format),

        Commands::Show { execution_id } => handlers::show::handle(&ctx, &execution_id, format),

        Commands::Timeline { execution_id, from, to } => {
            handlers::timeline::handle(&ctx, &execution_id, from, to, format)
        }

        Commands::Reconstruct { execution_id, sequence } => {
            handlers::reconstruct::handle(&ctx, &execution_id, sequence, format)
        }

        Commands::Validate { execution_id } => handlers::validate::handle(&ctx, &execution_id, format),

        Commands::Replay {
            execution_id,
            from_sequence,
            mode,
            max_steps,
            stop_at_sequence,
            compare_with_original,
        } => handlers::replay::handle(
            &ctx,
            &execution_id,
            from_sequence,
            mode,
            max_steps,
            stop_at_sequence,
            compare_with_original,
            format,
        ),

        Commands::Branch {
            execution_id,
            branch_point,
            mod_kind,
            mod_path,
            mod_value,
            mode,
        } => handlers::branch::handle(
            &ctx,
            &execution_id,
            branch_point,
            mod_kind,
            mod_path,
            mod_value,
            mode,
            format,
        ),
    }
}
