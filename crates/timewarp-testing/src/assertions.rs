//! Custom assertions for timewarp-specific validation.

use anyhow::{bail, Context, Result};

use timewarp_types::{ExecutionSnapshot, ExecutionStatus, ExecutionSummary};

/// Assert that `snapshots` is sorted by strictly increasing `sequence_num`
/// — the ordering invariant the store and engine both depend on. Gaps are
/// allowed; duplicates and inversions are not.
pub fn assert_sequence_contiguous(snapshots: &[ExecutionSnapshot]) -> Result<()> {
    for pair in snapshots.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if b.sequence_num <= a.sequence_num {
            bail!(
                "sequence_num did not strictly increase: {} followed by {}",
                a.sequence_num,
                b.sequence_num
            );
        }
    }
    Ok(())
}

/// Assert a summary reports the expected terminal (or running) status.
pub fn assert_status(summary: &ExecutionSummary, expected: ExecutionStatus) -> Result<()> {
    if summary.status != expected {
        bail!(
            "expected execution {} to have status {:?}, got {:?}",
            summary.execution_id,
            expected,
            summary.status
        );
    }
    Ok(())
}

/// Assert a summary's checkpoint tally contains at least `count` of `kind`.
pub fn assert_checkpoint_count_at_least(
    summary: &ExecutionSummary,
    kind: timewarp_types::CheckpointKind,
    count: usize,
) -> Result<()> {
    let actual = summary.checkpoint_counts.get(&kind).copied().unwrap_or(0);
    if actual < count {
        bail!(
            "expected at least {} {:?} checkpoints, got {}",
            count,
            kind,
            actual
        );
    }
    Ok(())
}

/// Assert every snapshot in the slice shares the same `execution_id`.
pub fn assert_single_execution(snapshots: &[ExecutionSnapshot]) -> Result<()> {
    let first = snapshots
        .first()
        .context("expected at least one snapshot")?;
    for snap in snapshots {
        if snap.execution_id != first.execution_id {
            bail!(
                "mixed execution ids: {} and {}",
                first.execution_id,
                snap.execution_id
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_assert_sequence_contiguous_rejects_gaps() {
        let mut snaps = fixtures::sample_execution("E1");
        snaps.remove(2);
        assert!(assert_sequence_contiguous(&snaps).is_ok());

        snaps.swap(0, 1);
        assert!(assert_sequence_contiguous(&snaps).is_err());
    }

    #[test]
    fn test_assert_single_execution() {
        let snaps = fixtures::sample_execution("E1");
        assert!(assert_single_execution(&snaps).is_ok());
    }
}
