//! In-memory what-if branching over replayed executions: fork a timeline at
//! a sequence, replay it with a modification, and compare the outcome
//! against its parent or a sibling branch.

mod engine;
mod error;
mod types;

pub use engine::BranchEngine;
pub use error::{Error, Result};
pub use types::{
    Branch, BranchComparison, BranchOptions, BranchStatus, BranchTreeNode, SequenceDiff,
    SequenceDiffEntry,
};
