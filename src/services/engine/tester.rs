use tracing::debug;

use super::{done, NodeContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Granularity, NodeResult, Outcome, Partition, Role, Step, TestMode, TestWork,
};

/// Test a delta; on failure, split it and test every part.
pub(super) async fn test(ctx: &NodeContext<'_>, work: TestWork) -> DomainResult<Step> {
    let TestWork {
        delta,
        granularity,
        mode,
        known,
        complement_hints,
        part_hints,
    } = work;

    if delta.is_empty() {
        return Err(DomainError::StructuralInvariant(
            "tester received an empty delta".to_string(),
        ));
    }
    ctx.started(Role::Tester, delta.len(), granularity.parts());

    let outcome = match known {
        Some(outcome) => outcome,
        None => ctx.run_oracle(&delta).await?,
    };
    debug!(
        size = delta.len(),
        outcome = %outcome,
        known = known.is_some(),
        "tested delta"
    );

    if outcome == Outcome::Pass {
        return Ok(done(NodeResult::Passed));
    }
    if mode == TestMode::ProbeOnly {
        return Ok(done(NodeResult::Probed));
    }
    if delta.len() == 1 {
        return ctx.close_found(Role::Tester, "atom", vec![delta]).await;
    }

    let partition = match granularity {
        Granularity::Split(n) => Partition::contiguous(&delta, n.max(2)),
        Granularity::Explicit(partition) => {
            if partition.len() < 2 || partition.universe().canonical_key() != delta.canonical_key()
            {
                return Err(DomainError::StructuralInvariant(format!(
                    "explicit partition of {} parts does not subdivide a delta of {} atoms",
                    partition.len(),
                    delta.len()
                )));
            }
            partition
        }
    };

    ctx.fan_out(partition, complement_hints, part_hints).await
}
