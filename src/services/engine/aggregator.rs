use super::{done, NodeContext};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AggregateWork, Granularity, NodeResult, Role, SearchMode, Step, TestMode, TestWork,
    WorkItem,
};

/// Fan-in over the per-part results of a failing delta.
///
/// Any failing part is merged up. If every part passes, the cause spans
/// several parts: small partitions are bisected further, larger ones have
/// their complements tested.
pub(super) async fn aggregate(ctx: &NodeContext<'_>, work: AggregateWork) -> DomainResult<Step> {
    let AggregateWork {
        partition,
        inputs,
        hints,
    } = work;
    let results = ctx.fetch_nodes(&inputs).await?;
    let n = partition.len();
    let universe = partition.universe();
    ctx.started(Role::Aggregator, universe.len(), n);

    if results.iter().any(NodeResult::is_fail) {
        ctx.decision(Role::Aggregator, "merge");
        return Ok(done(NodeResult::merge(results)));
    }

    if n <= 2 {
        if universe.len() <= 2 {
            return ctx
                .close_found(Role::Aggregator, "interaction pair", vec![universe])
                .await;
        }
        ctx.decision(Role::Aggregator, "bisect parts");
        return ctx.fan_out(partition.refine(), Vec::new(), Vec::new()).await;
    }

    let mode = ctx.search().mode;
    let test_mode = match mode {
        SearchMode::Default => TestMode::Recurse,
        SearchMode::Analyse => TestMode::ProbeOnly,
    };
    let granularity = (n - 1).max(2);
    let tests = (0..n)
        .map(|index| {
            WorkItem::Test(TestWork {
                delta: partition.complement(index),
                granularity: Granularity::Split(granularity),
                mode: test_mode,
                known: hints.get(index).copied().flatten(),
                complement_hints: Vec::new(),
                part_hints: Vec::new(),
            })
        })
        .collect();
    ctx.decision(Role::Aggregator, "test complements");
    let inputs = ctx.spawn_all(tests).await?;

    let next = AggregateWork {
        partition,
        inputs,
        hints: Vec::new(),
    };
    Ok(Step::Delegate(match mode {
        SearchMode::Default => WorkItem::AggregateComplements(next),
        SearchMode::Analyse => WorkItem::Analyse(next),
    }))
}

/// Fan-in over the complement results of a partition whose parts all passed.
pub(super) async fn aggregate_complements(
    ctx: &NodeContext<'_>,
    work: AggregateWork,
) -> DomainResult<Step> {
    let AggregateWork {
        partition, inputs, ..
    } = work;
    let results = ctx.fetch_nodes(&inputs).await?;
    ctx.started(
        Role::ComplementAggregator,
        partition.universe().len(),
        partition.len(),
    );

    if results.iter().any(NodeResult::is_fail) {
        ctx.decision(Role::ComplementAggregator, "merge");
        return Ok(done(NodeResult::merge(results)));
    }

    ctx.escalate(Role::ComplementAggregator, &partition).await
}
