//! Stable facade over the snapshot store, recorder, timeline engine, replay
//! engine and branching engine, for applications embedding the debugger
//! rather than driving it through the CLI.
//!
//! ```no_run
//! use timewarp_sdk::Client;
//! use timewarp_types::Context;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::open_in_memory();
//! let ctx = Context::background();
//! client.recorder().start_execution("agent-1");
//! // ... client.recorder().record(&ctx, checkpoint) as events arrive ...
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};

// Re-exported so embedding applications don't need to depend on the
// individual layer crates just to name their types.
pub use timewarp_branch::{Branch, BranchComparison, BranchOptions, BranchStatus, BranchTreeNode};
pub use timewarp_engine::{ReconstructedState, StateComparison, StateTransition, TransitionField};
pub use timewarp_recorder::RecorderConfig;
pub use timewarp_replay::{Modification, ModificationType, ReplayMode, ReplayOptions, ReplayResult};
pub use timewarp_types::{Checkpoint, CheckpointKind, Context, ExecutionSnapshot};
