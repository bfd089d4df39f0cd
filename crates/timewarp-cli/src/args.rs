use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "timewarp")]
#[command(about = "Navigate, reconstruct, replay and branch recorded agent executions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the SQLite store. Falls back to $TIMEWARP_PATH, then
    /// ~/.timewarp/store.db.
    #[arg(long, global = true)]
    pub data_path: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplayModeArg {
    Simulate,
    Execute,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModificationKindArg {
    Input,
    Workspace,
    ToolResponse,
    LlmResponse,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List recorded executions, most recent first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show one execution's summary.
    Show { execution_id: String },

    /// Print the ordered snapshot log of one execution.
    Timeline {
        execution_id: String,
        #[arg(long)]
        from: Option<u64>,
        #[arg(long)]
        to: Option<u64>,
    },

    /// Rebuild session/task/workspace state as of a sequence.
    Reconstruct {
        execution_id: String,
        sequence: u64,
    },

    /// Check an execution's snapshot log for invariant violations.
    Validate { execution_id: String },

    /// Replay an execution's suffix under simulate, execute or hybrid mode.
    Replay {
        execution_id: String,
        from_sequence: u64,
        #[arg(long, value_enum, default_value = "simulate")]
        mode: ReplayModeArg,
        #[arg(long)]
        max_steps: Option<u64>,
        #[arg(long)]
        stop_at_sequence: Option<u64>,
        #[arg(long, default_value_t = true)]
        compare_with_original: bool,
    },

    /// Fork a what-if branch at a sequence and run it to completion.
    Branch {
        execution_id: String,
        branch_point: u64,
        #[arg(long, value_enum)]
        mod_kind: Option<ModificationKindArg>,
        #[arg(long, requires = "mod_kind")]
        mod_path: Option<String>,
        /// JSON literal, e.g. `"patched"` or `{"a":1}`.
        #[arg(long, requires = "mod_kind")]
        mod_value: Option<String>,
        #[arg(long, value_enum)]
        mode: Option<ReplayModeArg>,
    },
}
