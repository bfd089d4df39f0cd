//! Timeline navigation, analytics and point-in-time state reconstruction
//! over a recorded execution.
//!
//! This crate is read-only: it never writes to a `SnapshotStore`, only
//! scans what a recorder already persisted.

mod error;
mod reconstructor;
mod timeline;

pub use error::{Error, Result};
pub use reconstructor::{
    compare_states, find_state_transitions, reconstruct, ReconstructedState, SessionDiff,
    StateComparison, StateTransition, TaskDiff, TransitionField, WorkspaceDiff,
};
pub use timeline::{Timeline, ValidationIssue, ValidationReport};
