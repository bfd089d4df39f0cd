use anyhow::{Context as _, Result};
use timewarp_sdk::{BranchOptions, Modification, ModificationType, ReplayMode};

use crate::args::{ModificationKindArg, OutputFormat, ReplayModeArg};
use crate::context::ExecutionContext;
use crate::output;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    ctx: &ExecutionContext,
    execution_id: &str,
    branch_point: u64,
    mod_kind: Option<ModificationKindArg>,
    mod_path: Option<String>,
    mod_value: Option<String>,
    mode: Option<ReplayModeArg>,
    format: OutputFormat,
) -> Result<()> {
    let modification = match (mod_kind, mod_path, mod_value) {
        (Some(kind), Some(path), Some(value)) => {
            let value = serde_json::from_str(&value)
                .with_context(|| format!("--mod-value is not valid JSON: {value}"))?;
            Some(Modification::new(to_modification_type(kind), path, value))
        }
        (None, _, _) => None,
        _ => anyhow::bail!("--mod-kind requires both --mod-path and --mod-value"),
    };

    let options = BranchOptions {
        name: None,
        description: None,
        modification,
        mode: mode.map(to_replay_mode),
    };

    let branch = ctx.client.what_if(&ctx.ctx, execution_id, branch_point, options)?;

    output::render(format, &branch, || {
        println!("{} {}", output::heading("branch"), branch.id);
        println!("  parent:      {}@{}", branch.parent_execution_id, branch.branch_point_sequence);
        println!("  status:      {:?}", branch.status);
        if let Some(error) = &branch.error {
            println!("  {}: {}", output::bad("error"), error);
        }
        if let Some(result) = &branch.result {
            println!("  steps:       {}", result.steps_replayed());
            println!(
                "  result:      {}",
                if result.success { output::good("success") } else { output::bad("failed") }
            );
        }
    });

    Ok(())
}

fn to_modification_type(kind: ModificationKindArg) -> ModificationType {
    match kind {
        ModificationKindArg::Input => ModificationType::Input,
        ModificationKindArg::Workspace => ModificationType::Workspace,
        ModificationKindArg::ToolResponse => ModificationType::ToolResponse,
        ModificationKindArg::LlmResponse => ModificationType::LlmResponse,
    }
}

fn to_replay_mode(mode: ReplayModeArg) -> ReplayMode {
    match mode {
        ReplayModeArg::Simulate => ReplayMode::Simulate,
        ReplayModeArg::Execute => ReplayMode::Execute,
        ReplayModeArg::Hybrid => ReplayMode::Hybrid,
    }
}
