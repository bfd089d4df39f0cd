//! Replays a recorded execution's suffix in `simulate`, `execute` or
//! `hybrid` mode, either as a single batch walk or one step at a time.

mod engine;
mod error;
mod executors;
mod types;

pub use engine::{ReplayEngine, ReplayWalker};
pub use error::{Error, Result};
pub use executors::{LLMExecutor, ToolExecutor};
pub use types::{
    Modification, ModificationType, ReplayMode, ReplayOptions, ReplayResult, ReplayStep,
    StateDifference, StopReason,
};
