use std::time::Duration;

use chrono::{DateTime, Utc};
use timewarp_types::{
    CheckpointKind, Context, ExecutionSnapshot, ExecutionSummary, OrderBy, QueryResult,
    SnapshotFilter, StoreStats,
};

use crate::error::Result;

/// The snapshot store abstraction: an append-only, ordered log keyed
/// by `(execution_id, sequence_num)`. Every method takes a `Context` so
/// callers can cancel long-running scans; both implementations honor it on a
/// best-effort basis between rows/batches rather than mid-statement.
///
/// The trait is deliberately narrow — it's the *only* polymorphic boundary
/// in the system — so the SQLite backend stays additive and never grows
/// hidden public methods beyond this contract.
pub trait SnapshotStore: Send + Sync {
    /// Persist one snapshot. Assigns `id`/`timestamp` if unset. Idempotent on
    /// `(execution_id, sequence_num)` — the latest write wins.
    fn save(&self, ctx: &Context, snapshot: ExecutionSnapshot) -> Result<ExecutionSnapshot>;

    /// Persist a batch. Atomic all-or-nothing where the backend supports
    /// transactions (SQLite); best-effort sequential for the in-memory store.
    fn save_batch(
        &self,
        ctx: &Context,
        snapshots: Vec<ExecutionSnapshot>,
    ) -> Result<Vec<ExecutionSnapshot>>;

    fn get(&self, ctx: &Context, id: uuid::Uuid) -> Result<ExecutionSnapshot>;

    fn get_by_execution(&self, ctx: &Context, execution_id: &str) -> Result<Vec<ExecutionSnapshot>>;

    fn get_by_execution_range(
        &self,
        ctx: &Context,
        execution_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<ExecutionSnapshot>>;

    fn get_by_time_range(
        &self,
        ctx: &Context,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExecutionSnapshot>>;

    fn get_by_checkpoint_type(
        &self,
        ctx: &Context,
        execution_id: &str,
        kind: CheckpointKind,
    ) -> Result<Vec<ExecutionSnapshot>>;

    fn get_latest(&self, ctx: &Context, execution_id: &str) -> Result<ExecutionSnapshot>;

    fn get_at_sequence(
        &self,
        ctx: &Context,
        execution_id: &str,
        sequence_num: u64,
    ) -> Result<ExecutionSnapshot>;

    fn query(
        &self,
        ctx: &Context,
        filter: &SnapshotFilter,
        limit: usize,
        offset: usize,
        order_by: OrderBy,
    ) -> Result<QueryResult>;

    fn list_executions(
        &self,
        ctx: &Context,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExecutionSummary>>;

    fn get_execution_summary(&self, ctx: &Context, execution_id: &str) -> Result<ExecutionSummary>;

    /// Delete snapshots older than `age`. Returns the number deleted.
    fn purge_older_than(&self, ctx: &Context, age: Duration) -> Result<usize>;

    /// Delete every snapshot for one execution. Returns the number deleted.
    fn purge_execution(&self, ctx: &Context, execution_id: &str) -> Result<usize>;

    fn stats(&self, ctx: &Context) -> Result<StoreStats>;

    /// Release handles. Idempotent — calling `close` twice is not an error.
    fn close(&self) -> Result<()>;
}
