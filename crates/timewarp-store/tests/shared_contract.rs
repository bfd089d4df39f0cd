//! Both backends must honor the same `SnapshotStore` contract. Each
//! scenario is written once as a generic function and run against both.

use timewarp_store::{MemoryStore, SnapshotStore, SqlStore};
use timewarp_testing::fixtures;
use timewarp_types::{Context, ExecutionStatus, OrderBy, SnapshotFilter};

macro_rules! for_each_backend {
    ($name:ident, $check:ident) => {
        mod $name {
            use super::*;

            #[test]
            fn memory() {
                $check(MemoryStore::new());
            }

            #[test]
            fn sql() {
                $check(SqlStore::open_in_memory().unwrap());
            }
        }
    };
}

fn record_and_list(store: impl SnapshotStore) {
    let ctx = Context::background();
    for snap in fixtures::sample_execution("exec-1") {
        store.save(&ctx, snap).unwrap();
    }

    let snaps = store.get_by_execution(&ctx, "exec-1").unwrap();
    assert_eq!(snaps.len(), 7);

    let summary = store.get_execution_summary(&ctx, "exec-1").unwrap();
    assert_eq!(summary.total_steps, 7);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.status, ExecutionStatus::Completed);
}

fn idempotent_upsert(store: impl SnapshotStore) {
    let ctx = Context::background();
    let mut snaps = fixtures::sample_execution("exec-2");
    for snap in snaps.clone() {
        store.save(&ctx, snap).unwrap();
    }

    // Re-save the third checkpoint with a different output: same
    // (execution_id, sequence_num), so it must overwrite in place rather
    // than append.
    let mut replay = snaps.remove(2);
    replay.output = Some(serde_json::json!("replayed"));
    store.save(&ctx, replay).unwrap();

    let after = store.get_by_execution(&ctx, "exec-2").unwrap();
    assert_eq!(after.len(), 7, "upsert must not grow the log");
    assert_eq!(
        after[2].output,
        Some(serde_json::json!("replayed")),
        "latest write should win"
    );
}

fn crash_before_completion_reports_running(store: impl SnapshotStore) {
    let ctx = Context::background();
    for snap in fixtures::crashed_execution("exec-3") {
        store.save(&ctx, snap).unwrap();
    }

    let summary = store.get_execution_summary(&ctx, "exec-3").unwrap();
    assert_eq!(summary.status, ExecutionStatus::Running);
}

fn errors_are_queryable(store: impl SnapshotStore) {
    let ctx = Context::background();
    for snap in fixtures::execution_with_errors("exec-4") {
        store.save(&ctx, snap).unwrap();
    }

    let filter = SnapshotFilter::new()
        .with_execution_id("exec-4")
        .with_has_error(true);
    let result = store.query(&ctx, &filter, 10, 0, OrderBy::SequenceAsc).unwrap();
    assert_eq!(result.total_count, 2);
    assert!(result.snapshots.iter().all(|s| s.has_error()));
}

fn purge_execution_clears_the_log(store: impl SnapshotStore) {
    let ctx = Context::background();
    for snap in fixtures::sample_execution("exec-5") {
        store.save(&ctx, snap).unwrap();
    }

    let purged = store.purge_execution(&ctx, "exec-5").unwrap();
    assert_eq!(purged, 7);
    assert!(store.get_by_execution(&ctx, "exec-5").unwrap().is_empty());
}

for_each_backend!(record_and_list_mod, record_and_list);
for_each_backend!(idempotent_upsert_mod, idempotent_upsert);
for_each_backend!(crash_before_completion_mod, crash_before_completion_reports_running);
for_each_backend!(errors_are_queryable_mod, errors_are_queryable);
for_each_backend!(purge_execution_mod, purge_execution_clears_the_log);
