//! Core data model for the time-travel debugger.
//!
//! This crate has no knowledge of storage, recording or replay — it only
//! defines the shapes those layers pass around: the checkpoint taxonomy,
//! the immutable `ExecutionSnapshot`, query/filter shapes, the cancellation
//! `Context`, and the shared `Error` taxonomy.

mod checkpoint;
mod context;
mod error;
mod filter;
mod snapshot;
mod summary;
mod value;

pub use checkpoint::CheckpointKind;
pub use context::Context;
pub use error::{Error, Result};
pub use filter::{OrderBy, QueryResult, SnapshotFilter, DEFAULT_QUERY_LIMIT};
pub use snapshot::{
    ActionKind, ActionSnapshot, Checkpoint, ErrorSnapshot, ExecutionSnapshot, SessionState,
    SessionStatus, TaskState, TaskStatus, WorkspaceState,
};
pub use summary::{ExecutionStatus, ExecutionSummary, StoreStats};
pub use value::{canonical_byte_len, Value};
