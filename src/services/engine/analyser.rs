use super::NodeContext;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AggregateWork, Granularity, NodeResult, Outcome, PairProbe, Partition, ResolveWork, Role,
    Step, TestWork, WorkItem,
};

/// Reason about the pattern of failing complements instead of recursing into
/// each of them.
pub(super) async fn analyse(ctx: &NodeContext<'_>, work: AggregateWork) -> DomainResult<Step> {
    let AggregateWork {
        partition, inputs, ..
    } = work;
    let results = ctx.fetch_nodes(&inputs).await?;
    ctx.started(Role::Analyser, partition.universe().len(), partition.len());

    let complements: Vec<Outcome> = results.iter().map(NodeResult::outcome).collect();
    let failing: Vec<usize> = complements
        .iter()
        .enumerate()
        .filter(|(_, outcome)| outcome.is_fail())
        .map(|(index, _)| index)
        .collect();

    match failing.as_slice() {
        [] => ctx.escalate(Role::Analyser, &partition).await,
        [index] => one_failure(ctx, partition, *index).await,
        _ => probe_pairs(ctx, partition, complements, &failing).await,
    }
}

/// Exactly one complement fails: the cause lies inside it.
async fn one_failure(
    ctx: &NodeContext<'_>,
    partition: Partition,
    index: usize,
) -> DomainResult<Step> {
    let reduced = partition.complement(index);
    if partition.is_atomic() {
        return ctx
            .close_found(Role::Analyser, "closed form", vec![reduced])
            .await;
    }

    ctx.decision(Role::Analyser, "one failing complement");
    let subdivision = partition.refine_excluding(&[index]);
    Ok(Step::Delegate(WorkItem::Test(
        TestWork::recurse(reduced, Granularity::Explicit(subdivision)).with_known(Outcome::Fail),
    )))
}

/// Several complements fail: probe the universe without every pair of
/// failing parts, except bisection siblings whose outcome is already known.
async fn probe_pairs(
    ctx: &NodeContext<'_>,
    partition: Partition,
    complements: Vec<Outcome>,
    failing: &[usize],
) -> DomainResult<Step> {
    let conjugates: Vec<Option<usize>> = complements
        .iter()
        .enumerate()
        .map(|(index, outcome)| {
            outcome.is_fail().then(|| match partition.sibling_of(index) {
                Some(sibling) if complements[sibling].is_fail() => sibling,
                _ => index,
            })
        })
        .collect();

    let universe = partition.universe();
    let mut pairs = Vec::new();
    let mut probes = Vec::new();
    for (pos, &first) in failing.iter().enumerate() {
        for &second in &failing[pos + 1..] {
            if conjugates[first] == Some(second) {
                continue;
            }
            let delta = universe.minus_all([partition.part(first), partition.part(second)]);
            if delta.is_empty() {
                continue;
            }
            pairs.push((first, second));
            probes.push(WorkItem::Test(TestWork::probe(delta)));
        }
    }

    ctx.decision(Role::Analyser, "probe failing pairs");
    let handles = ctx.spawn_all(probes).await?;
    let probes = pairs
        .into_iter()
        .zip(handles)
        .map(|((first, second), handle)| PairProbe {
            first,
            second,
            handle,
        })
        .collect();

    Ok(Step::Delegate(WorkItem::Resolve(ResolveWork {
        partition,
        complements,
        conjugates,
        probes,
    })))
}
