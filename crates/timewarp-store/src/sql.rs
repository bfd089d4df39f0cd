use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use uuid::Uuid;

use timewarp_types::{
    CheckpointKind, Context, ExecutionSnapshot, ExecutionSummary, OrderBy, QueryResult,
    SnapshotFilter, StoreStats, DEFAULT_QUERY_LIMIT,
};

use crate::error::{Error, Result};
use crate::traits::SnapshotStore;

// NOTE: Schema is schema-on-write here (unlike the reference platform's
// pointer index, which is schema-on-read over externally-owned log files):
// this store *is* the source of truth for the snapshot log, so the
// complex/optional captures are still JSON blobs for flexibility, but every
// scalar used in a WHERE clause gets a real column and index.

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS execution_snapshots (
    id              TEXT PRIMARY KEY,
    execution_id    TEXT NOT NULL,
    sequence_num    INTEGER NOT NULL,
    timestamp       TEXT NOT NULL,
    checkpoint_type TEXT NOT NULL,
    agent_id        TEXT,
    task_id         TEXT,
    worker_id       TEXT,
    session_id      TEXT,
    trace_id        TEXT,
    span_id         TEXT,
    parent_span_id  TEXT,
    session_state   TEXT,
    task_state      TEXT,
    workspace_state TEXT,
    action          TEXT,
    input           TEXT,
    output          TEXT,
    error           TEXT,
    metadata        TEXT NOT NULL DEFAULT '{}',
    has_error       INTEGER NOT NULL DEFAULT 0,
    UNIQUE(execution_id, sequence_num)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_execution ON execution_snapshots(execution_id);
CREATE INDEX IF NOT EXISTS idx_snapshots_timestamp ON execution_snapshots(timestamp);
CREATE INDEX IF NOT EXISTS idx_snapshots_checkpoint_type ON execution_snapshots(checkpoint_type);
CREATE INDEX IF NOT EXISTS idx_snapshots_agent ON execution_snapshots(agent_id) WHERE agent_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_snapshots_task ON execution_snapshots(task_id) WHERE task_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_snapshots_session ON execution_snapshots(session_id) WHERE session_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_snapshots_trace ON execution_snapshots(trace_id) WHERE trace_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_snapshots_has_error ON execution_snapshots(has_error) WHERE has_error = 1;
"#;

/// Configuration for [`SqlStore`].
#[derive(Debug, Clone, Default)]
pub struct SqlStoreConfig {
    /// Number of rows written per transaction in `save_batch`. Reserved for
    /// callers that want to chunk very large batches; the current
    /// implementation always commits one transaction per call.
    pub batch_size: usize,
}

/// SQLite-backed `SnapshotStore`. Holds one connection behind a mutex —
/// rusqlite connections aren't `Sync`, and a single-writer SQLite database
/// gains nothing from a connection pool here.
pub struct SqlStore {
    conn: Mutex<Option<Connection>>,
}

impl SqlStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let guard = self.conn.lock().unwrap();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(Error::Unavailable("store is closed".to_string())),
        }
    }

    fn check_cancelled(&self, ctx: &Context) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

fn opt_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    match value {
        Some(v) => Ok(Some(
            serde_json::to_string(v).map_err(|e| Error::InvalidArgument(e.to_string()))?,
        )),
        None => Ok(None),
    }
}

fn row_to_snapshot(row: &Row) -> rusqlite::Result<ExecutionSnapshot> {
    let id: String = row.get("id")?;
    let timestamp: String = row.get("timestamp")?;
    let checkpoint_type: String = row.get("checkpoint_type")?;
    let session_state: Option<String> = row.get("session_state")?;
    let task_state: Option<String> = row.get("task_state")?;
    let workspace_state: Option<String> = row.get("workspace_state")?;
    let action: Option<String> = row.get("action")?;
    let input: Option<String> = row.get("input")?;
    let output: Option<String> = row.get("output")?;
    let error: Option<String> = row.get("error")?;
    let metadata: String = row.get("metadata")?;

    fn deserialize_col<T: serde::de::DeserializeOwned>(
        name: &'static str,
        raw: Option<String>,
    ) -> rusqlite::Result<Option<T>> {
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("{name}: {e}"),
                    )),
                )
            })
    }

    Ok(ExecutionSnapshot {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        execution_id: row.get("execution_id")?,
        sequence_num: row.get::<_, i64>("sequence_num")? as u64,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        checkpoint_type: CheckpointKind::from_str_opt(&checkpoint_type).unwrap_or(CheckpointKind::Error),
        agent_id: row.get("agent_id")?,
        task_id: row.get("task_id")?,
        worker_id: row.get("worker_id")?,
        session_id: row.get("session_id")?,
        trace_id: row.get("trace_id")?,
        span_id: row.get("span_id")?,
        parent_span_id: row.get("parent_span_id")?,
        session_state: deserialize_col("session_state", session_state)?,
        task_state: deserialize_col("task_state", task_state)?,
        workspace_state: deserialize_col("workspace_state", workspace_state)?,
        action: deserialize_col("action", action)?,
        input: deserialize_col("input", input)?,
        output: deserialize_col("output", output)?,
        error: deserialize_col("error", error)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
    })
}

const SELECT_COLUMNS: &str = "id, execution_id, sequence_num, timestamp, checkpoint_type, \
    agent_id, task_id, worker_id, session_id, trace_id, span_id, parent_span_id, \
    session_state, task_state, workspace_state, action, input, output, error, metadata";

fn upsert(conn: &Connection, snapshot: &ExecutionSnapshot) -> Result<()> {
    conn.execute(
        &format!(
            r#"
            INSERT INTO execution_snapshots ({SELECT_COLUMNS}, has_error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            ON CONFLICT(execution_id, sequence_num) DO UPDATE SET
                id = excluded.id,
                timestamp = excluded.timestamp,
                checkpoint_type = excluded.checkpoint_type,
                agent_id = excluded.agent_id,
                task_id = excluded.task_id,
                worker_id = excluded.worker_id,
                session_id = excluded.session_id,
                trace_id = excluded.trace_id,
                span_id = excluded.span_id,
                parent_span_id = excluded.parent_span_id,
                session_state = excluded.session_state,
                task_state = excluded.task_state,
                workspace_state = excluded.workspace_state,
                action = excluded.action,
                input = excluded.input,
                output = excluded.output,
                error = excluded.error,
                metadata = excluded.metadata,
                has_error = excluded.has_error
            "#
        ),
        params![
            snapshot.id.to_string(),
            snapshot.execution_id,
            snapshot.sequence_num as i64,
            snapshot.timestamp.to_rfc3339(),
            snapshot.checkpoint_type.as_str(),
            snapshot.agent_id,
            snapshot.task_id,
            snapshot.worker_id,
            snapshot.session_id,
            snapshot.trace_id,
            snapshot.span_id,
            snapshot.parent_span_id,
            opt_json(&snapshot.session_state)?,
            opt_json(&snapshot.task_state)?,
            opt_json(&snapshot.workspace_state)?,
            opt_json(&snapshot.action)?,
            opt_json(&snapshot.input)?,
            opt_json(&snapshot.output)?,
            opt_json(&snapshot.error)?,
            serde_json::to_string(&snapshot.metadata).unwrap_or_else(|_| "{}".to_string()),
            snapshot.has_error() as i64,
        ],
    )?;
    Ok(())
}

impl SnapshotStore for SqlStore {
    fn save(&self, ctx: &Context, mut snapshot: ExecutionSnapshot) -> Result<ExecutionSnapshot> {
        self.check_cancelled(ctx)?;
        if snapshot.id.is_nil() {
            snapshot.id = Uuid::new_v4();
        }
        if snapshot.timestamp.timestamp() == 0 {
            snapshot.timestamp = Utc::now();
        }
        self.with_conn(|conn| {
            upsert(conn, &snapshot)?;
            Ok(snapshot.clone())
        })
    }

    fn save_batch(
        &self,
        ctx: &Context,
        snapshots: Vec<ExecutionSnapshot>,
    ) -> Result<Vec<ExecutionSnapshot>> {
        self.check_cancelled(ctx)?;
        let mut prepared = snapshots;
        for snap in prepared.iter_mut() {
            if snap.id.is_nil() {
                snap.id = Uuid::new_v4();
            }
            if snap.timestamp.timestamp() == 0 {
                snap.timestamp = Utc::now();
            }
        }
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| Error::Unavailable("store is closed".to_string()))?;
        let tx = conn.transaction()?;
        for snap in &prepared {
            upsert(&tx, snap)?;
        }
        tx.commit()?;
        Ok(prepared)
    }

    fn get(&self, ctx: &Context, id: Uuid) -> Result<ExecutionSnapshot> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM execution_snapshots WHERE id = ?1"),
                params![id.to_string()],
                row_to_snapshot,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("snapshot {id}")))
        })
    }

    fn get_by_execution(&self, ctx: &Context, execution_id: &str) -> Result<Vec<ExecutionSnapshot>> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM execution_snapshots WHERE execution_id = ?1 ORDER BY sequence_num ASC"
            ))?;
            let rows = stmt
                .query_map(params![execution_id], row_to_snapshot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn get_by_execution_range(
        &self,
        ctx: &Context,
        execution_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<ExecutionSnapshot>> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM execution_snapshots \
                 WHERE execution_id = ?1 AND sequence_num BETWEEN ?2 AND ?3 \
                 ORDER BY sequence_num ASC"
            ))?;
            let rows = stmt
                .query_map(params![execution_id, from as i64, to as i64], row_to_snapshot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn get_by_time_range(
        &self,
        ctx: &Context,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExecutionSnapshot>> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM execution_snapshots \
                 WHERE timestamp >= ?1 AND timestamp <= ?2 ORDER BY timestamp ASC"
            ))?;
            let rows = stmt
                .query_map(params![from.to_rfc3339(), to.to_rfc3339()], row_to_snapshot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn get_by_checkpoint_type(
        &self,
        ctx: &Context,
        execution_id: &str,
        kind: CheckpointKind,
    ) -> Result<Vec<ExecutionSnapshot>> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM execution_snapshots \
                 WHERE execution_id = ?1 AND checkpoint_type = ?2 ORDER BY sequence_num ASC"
            ))?;
            let rows = stmt
                .query_map(params![execution_id, kind.as_str()], row_to_snapshot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    fn get_latest(&self, ctx: &Context, execution_id: &str) -> Result<ExecutionSnapshot> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM execution_snapshots \
                     WHERE execution_id = ?1 ORDER BY sequence_num DESC LIMIT 1"
                ),
                params![execution_id],
                row_to_snapshot,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("execution {execution_id}")))
        })
    }

    fn get_at_sequence(
        &self,
        ctx: &Context,
        execution_id: &str,
        sequence_num: u64,
    ) -> Result<ExecutionSnapshot> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM execution_snapshots \
                     WHERE execution_id = ?1 AND sequence_num = ?2"
                ),
                params![execution_id, sequence_num as i64],
                row_to_snapshot,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("{execution_id}@{sequence_num}")))
        })
    }

    fn query(
        &self,
        ctx: &Context,
        filter: &SnapshotFilter,
        limit: usize,
        offset: usize,
        order_by: OrderBy,
    ) -> Result<QueryResult> {
        self.check_cancelled(ctx)?;
        let limit = if limit == 0 { DEFAULT_QUERY_LIMIT } else { limit };

        let mut conditions: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref v) = filter.execution_id {
            conditions.push("execution_id = ?".to_string());
            params_vec.push(Box::new(v.clone()));
        }
        if let Some(ref v) = filter.agent_id {
            conditions.push("agent_id = ?".to_string());
            params_vec.push(Box::new(v.clone()));
        }
        if let Some(ref v) = filter.task_id {
            conditions.push("task_id = ?".to_string());
            params_vec.push(Box::new(v.clone()));
        }
        if let Some(ref v) = filter.session_id {
            conditions.push("session_id = ?".to_string());
            params_vec.push(Box::new(v.clone()));
        }
        if let Some(kind) = filter.checkpoint_type {
            conditions.push("checkpoint_type = ?".to_string());
            params_vec.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(ref kinds) = filter.checkpoint_types {
            if kinds.is_empty() {
                conditions.push("0".to_string());
            } else {
                let placeholders = vec!["?"; kinds.len()].join(", ");
                conditions.push(format!("checkpoint_type IN ({placeholders})"));
                for kind in kinds {
                    params_vec.push(Box::new(kind.as_str().to_string()));
                }
            }
        }
        if let Some(from) = filter.from_timestamp {
            conditions.push("timestamp >= ?".to_string());
            params_vec.push(Box::new(from.to_rfc3339()));
        }
        if let Some(to) = filter.to_timestamp {
            conditions.push("timestamp <= ?".to_string());
            params_vec.push(Box::new(to.to_rfc3339()));
        }
        if let Some(from) = filter.from_sequence {
            conditions.push("sequence_num >= ?".to_string());
            params_vec.push(Box::new(from as i64));
        }
        if let Some(to) = filter.to_sequence {
            conditions.push("sequence_num <= ?".to_string());
            params_vec.push(Box::new(to as i64));
        }
        if let Some(has_error) = filter.has_error {
            conditions.push("has_error = ?".to_string());
            params_vec.push(Box::new(has_error as i64));
        }
        if let Some(ref v) = filter.trace_id {
            conditions.push("trace_id = ?".to_string());
            params_vec.push(Box::new(v.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let order_sql = match order_by {
            OrderBy::SequenceAsc => "sequence_num ASC",
            OrderBy::SequenceDesc => "sequence_num DESC",
            OrderBy::TimeAsc => "timestamp ASC",
            OrderBy::TimeDesc => "timestamp DESC",
        };

        self.with_conn(|conn| {
            let count_sql = format!("SELECT COUNT(*) FROM execution_snapshots {where_clause}");
            let total_count: i64 = conn.query_row(
                &count_sql,
                rusqlite::params_from_iter(params_vec.iter()),
                |row| row.get(0),
            )?;

            let select_sql = format!(
                "SELECT {SELECT_COLUMNS} FROM execution_snapshots {where_clause} \
                 ORDER BY {order_sql} LIMIT ? OFFSET ?"
            );
            let mut all_params: Vec<&dyn ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();
            let limit_i64 = limit as i64;
            let offset_i64 = offset as i64;
            all_params.push(&limit_i64);
            all_params.push(&offset_i64);

            let mut stmt = conn.prepare(&select_sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(all_params), row_to_snapshot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(QueryResult::new(rows, total_count as usize, offset))
        })
    }

    fn list_executions(
        &self,
        ctx: &Context,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExecutionSummary>> {
        self.check_cancelled(ctx)?;
        let exec_ids: Vec<String> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT execution_id FROM execution_snapshots \
                 GROUP BY execution_id ORDER BY MAX(timestamp) DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![limit as i64, offset as i64], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(rows)
        })?;

        let mut summaries = Vec::with_capacity(exec_ids.len());
        for exec_id in exec_ids {
            if let Ok(summary) = self.get_execution_summary(ctx, &exec_id) {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    fn get_execution_summary(&self, ctx: &Context, execution_id: &str) -> Result<ExecutionSummary> {
        let snaps = self.get_by_execution(ctx, execution_id)?;
        ExecutionSummary::from_snapshots(execution_id, &snaps)
            .ok_or_else(|| Error::NotFound(format!("execution {execution_id}")))
    }

    fn purge_older_than(&self, ctx: &Context, age: Duration) -> Result<usize> {
        self.check_cancelled(ctx)?;
        let cutoff = Utc::now()
            - chrono::Duration::from_std(age).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM execution_snapshots WHERE timestamp < ?1",
                params![cutoff.to_rfc3339()],
            )?;
            Ok(changed)
        })
    }

    fn purge_execution(&self, ctx: &Context, execution_id: &str) -> Result<usize> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM execution_snapshots WHERE execution_id = ?1",
                params![execution_id],
            )?;
            Ok(changed)
        })
    }

    fn stats(&self, ctx: &Context) -> Result<StoreStats> {
        self.check_cancelled(ctx)?;
        self.with_conn(|conn| {
            let (total, unique, oldest, newest, bytes): (
                i64,
                i64,
                Option<String>,
                Option<String>,
                Option<i64>,
            ) = conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT execution_id), MIN(timestamp), MAX(timestamp), \
                 SUM(LENGTH(COALESCE(session_state,'')) + LENGTH(COALESCE(task_state,'')) + \
                     LENGTH(COALESCE(workspace_state,'')) + LENGTH(COALESCE(action,'')) + \
                     LENGTH(COALESCE(input,'')) + LENGTH(COALESCE(output,'')) + \
                     LENGTH(COALESCE(error,'')) + LENGTH(metadata) + 128) \
                 FROM execution_snapshots",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;
            Ok(StoreStats {
                total_snapshots: total as usize,
                unique_executions: unique as usize,
                oldest_timestamp: oldest.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
                newest_timestamp: newest.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
                approx_bytes: bytes.unwrap_or(0) as u64,
            })
        })
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.conn.lock().unwrap();
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timewarp_types::CheckpointKind;

    fn make(execution_id: &str, seq: u64, kind: CheckpointKind) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: Uuid::nil(),
            execution_id: execution_id.to_string(),
            sequence_num: seq,
            timestamp: Utc::now(),
            checkpoint_type: kind,
            agent_id: Some("agent-1".to_string()),
            task_id: None,
            worker_id: None,
            session_id: None,
            trace_id: None,
            span_id: None,
            parent_span_id: None,
            session_state: None,
            task_state: None,
            workspace_state: None,
            action: None,
            input: None,
            output: None,
            error: None,
            metadata: Default::default(),
        }
    }

    #[test]
    fn schema_initializes_cleanly() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        assert_eq!(store.stats(&ctx).unwrap().total_snapshots, 0);
    }

    #[test]
    fn idempotent_upsert_keeps_latest_write() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        let mut first = make("E1", 5, CheckpointKind::ToolCallEnd);
        first.output = Some(serde_json::json!("v1"));
        store.save(&ctx, first).unwrap();

        let mut second = make("E1", 5, CheckpointKind::ToolCallEnd);
        second.output = Some(serde_json::json!("v2"));
        store.save(&ctx, second).unwrap();

        let got = store.get_at_sequence(&ctx, "E1", 5).unwrap();
        assert_eq!(got.output, Some(serde_json::json!("v2")));
        assert_eq!(store.get_by_execution(&ctx, "E1").unwrap().len(), 1);
    }

    #[test]
    fn get_by_execution_is_sorted_ascending() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        for seq in [3, 1, 2] {
            store.save(&ctx, make("E1", seq, CheckpointKind::AgentStep)).unwrap();
        }
        let seqs: Vec<u64> = store
            .get_by_execution(&ctx, "E1")
            .unwrap()
            .iter()
            .map(|s| s.sequence_num)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn batch_save_is_transactional() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        let batch = vec![
            make("E1", 1, CheckpointKind::TaskStarted),
            make("E1", 2, CheckpointKind::TaskCompleted),
        ];
        store.save_batch(&ctx, batch).unwrap();
        assert_eq!(store.get_by_execution(&ctx, "E1").unwrap().len(), 2);
    }

    #[test]
    fn query_filters_and_paginates() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        for seq in 1..=10u64 {
            store.save(&ctx, make("E1", seq, CheckpointKind::AgentStep)).unwrap();
        }
        let filter = SnapshotFilter::new().with_execution_id("E1");
        let result = store.query(&ctx, &filter, 3, 2, OrderBy::SequenceAsc).unwrap();
        assert_eq!(result.total_count, 10);
        assert_eq!(result.snapshots.len(), 3);
        assert!(result.has_more);
        assert_eq!(result.snapshots[0].sequence_num, 3);
    }

    #[test]
    fn purge_older_than_deletes_matching_rows() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        let mut old = make("E1", 1, CheckpointKind::AgentStep);
        old.timestamp = Utc::now() - chrono::Duration::days(10);
        store.save(&ctx, old).unwrap();
        store.save(&ctx, make("E1", 2, CheckpointKind::AgentStep)).unwrap();

        let purged = store.purge_older_than(&ctx, Duration::from_secs(86400)).unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.get_by_execution(&ctx, "E1").unwrap().len(), 1);
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = SqlStore::open_in_memory().unwrap();
        let ctx = Context::background();
        store.close().unwrap();
        assert!(store.save(&ctx, make("E1", 1, CheckpointKind::AgentStep)).is_err());
    }

    #[test]
    fn on_disk_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let ctx = Context::background();
        {
            let store = SqlStore::open(&path).unwrap();
            store.save(&ctx, make("E1", 1, CheckpointKind::TaskStarted)).unwrap();
        }
        let store = SqlStore::open(&path).unwrap();
        assert_eq!(store.get_by_execution(&ctx, "E1").unwrap().len(), 1);
    }
}
