use tracing::warn;

use super::NodeContext;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AggregateWork, ConflictMatrix, CorrectWork, Degree, Granularity, Guess, Outcome, Partition,
    ResolveWork, Role, Step, TaskHandle, TestWork, WorkItem,
};

/// Classify the conflict matrix and pick a strategy.
pub(super) async fn resolve(ctx: &NodeContext<'_>, work: ResolveWork) -> DomainResult<Step> {
    let ResolveWork {
        partition,
        complements,
        conjugates,
        probes,
    } = work;
    ctx.started(Role::Resolver, partition.universe().len(), partition.len());

    let failing: Vec<usize> = conjugates
        .iter()
        .enumerate()
        .filter_map(|(index, conjugate)| conjugate.map(|_| index))
        .collect();
    if failing.len() < 2 {
        return Err(DomainError::StructuralInvariant(format!(
            "resolver needs at least two failing complements, got {}",
            failing.len()
        )));
    }

    let mut matrix = ConflictMatrix::new(partition.len());
    for (index, outcome) in complements.iter().enumerate() {
        matrix.set_still_fails(index, index, outcome.is_fail());
    }
    let handles: Vec<TaskHandle> = probes.iter().map(|probe| probe.handle).collect();
    let results = ctx.fetch_nodes(&handles).await?;
    for (probe, result) in probes.iter().zip(&results) {
        matrix.set_still_fails(probe.first, probe.second, result.is_fail());
    }

    match matrix.classify()? {
        Degree::One => single_cause(ctx, partition, matrix, &failing).await,
        Degree::Two { first, second } => two_causes(ctx, partition, matrix, first, second).await,
        Degree::General => {
            ctx.decision(Role::Resolver, "general");
            reconstruct(ctx, partition, &matrix).await
        }
    }
}

/// Every failing complement still fails without any other: one cause sits
/// outside all failing parts.
async fn single_cause(
    ctx: &NodeContext<'_>,
    partition: Partition,
    matrix: ConflictMatrix,
    failing: &[usize],
) -> DomainResult<Step> {
    let delta = partition.complement_of(failing);
    if delta.is_empty() {
        warn!(parts = partition.len(), "degree-1 guess leaves nothing to test");
        ctx.decision(Role::Resolver, "general");
        return reconstruct(ctx, partition, &matrix).await;
    }

    ctx.decision(Role::Resolver, "degree 1");
    let subdivision = partition.refine_excluding(failing);
    let handle = ctx
        .spawn(WorkItem::Test(TestWork::recurse(
            delta,
            Granularity::Explicit(subdivision),
        )))
        .await?;

    Ok(Step::Delegate(WorkItem::Correct(CorrectWork {
        guess: Guess::Single,
        partition,
        matrix,
        verify: vec![handle],
    })))
}

/// Two groups of failing parts, one per cause: search each cause in the
/// universe without its group.
async fn two_causes(
    ctx: &NodeContext<'_>,
    partition: Partition,
    matrix: ConflictMatrix,
    first: usize,
    second: usize,
) -> DomainResult<Step> {
    let groups = [matrix.group_of(first), matrix.group_of(second)];
    let deltas: Vec<_> = groups
        .iter()
        .map(|group| partition.complement_of(group))
        .collect();
    if deltas.iter().any(|delta| delta.is_empty()) {
        warn!(parts = partition.len(), "degree-2 guess leaves nothing to test");
        ctx.decision(Role::Resolver, "general");
        return reconstruct(ctx, partition, &matrix).await;
    }

    ctx.decision(Role::Resolver, "degree 2");
    let tests = groups
        .iter()
        .zip(deltas)
        .map(|(group, delta)| {
            WorkItem::Test(TestWork::recurse(
                delta,
                Granularity::Explicit(partition.refine_excluding(group)),
            ))
        })
        .collect();
    let verify = ctx.spawn_all(tests).await?;

    Ok(Step::Delegate(WorkItem::Correct(CorrectWork {
        guess: Guess::Pair,
        partition,
        matrix,
        verify,
    })))
}

/// Classical path: recurse into every failing complement, reusing every
/// outcome the matrix already holds so that no subset is tested twice.
///
/// Every part of `partition` already passed on its own, so the parts of each
/// complement are handed down as known passes.
pub(super) async fn reconstruct(
    ctx: &NodeContext<'_>,
    partition: Partition,
    matrix: &ConflictMatrix,
) -> DomainResult<Step> {
    let n = partition.len();
    let granularity = (n - 1).max(2);
    let tests = (0..n)
        .map(|index| {
            let complement = partition.complement(index);
            if !matrix.still_fails(index, index) {
                return WorkItem::Test(
                    TestWork::recurse(complement, Granularity::Split(granularity))
                        .with_known(Outcome::Pass),
                );
            }

            let hints = (0..n)
                .filter(|&other| other != index)
                .map(|other| Some(Outcome::from_pass(!matrix.still_fails(index, other))))
                .collect();
            WorkItem::Test(
                TestWork::recurse(complement, Granularity::Explicit(partition.without(&[index])))
                    .with_known(Outcome::Fail)
                    .with_hints(hints)
                    .with_part_hints(vec![Some(Outcome::Pass); n - 1]),
            )
        })
        .collect();
    let inputs = ctx.spawn_all(tests).await?;

    Ok(Step::Delegate(WorkItem::Aggregate(AggregateWork {
        partition,
        inputs,
        hints: Vec::new(),
    })))
}
