use tracing::{debug, info};

use super::NodeContext;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Granularity, Role, RoundLink, RoundWork, Step, TaskTag, TaskValue, TestWork, WorkItem,
};

/// Extend the round chain by one link.
///
/// Runs once the previous iteration is complete. The universe shrinks by the
/// atoms of every subset found so far; the chain ends as soon as an iteration
/// passes or nothing is left to search.
pub(super) async fn advance(ctx: &NodeContext<'_>, work: RoundWork) -> DomainResult<Step> {
    let RoundWork {
        mut universe,
        previous,
        index,
    } = work;

    if let Some(previous) = previous {
        let result = ctx.fetch(previous).await?.into_node()?;
        if !result.is_fail() {
            info!(round = index, "round passed, search complete");
            return Ok(end(index));
        }
        universe = universe.minus_all(result.found());
    }

    if universe.is_empty() {
        info!(round = index, "search space exhausted");
        return Ok(end(index));
    }

    ctx.started(Role::Round, universe.len(), 2);
    let iteration = ctx
        .substrate
        .invoke(
            WorkItem::Test(TestWork::recurse(universe.clone(), Granularity::Split(2))),
            Some(TaskTag::RoundIteration),
        )
        .await?;
    debug!(round = index, remaining = universe.len(), "scheduled round");

    let next = ctx
        .spawn(WorkItem::Round(RoundWork {
            universe,
            previous: Some(iteration),
            index: index + 1,
        }))
        .await?;

    Ok(Step::Done(TaskValue::Round(RoundLink::Step {
        index,
        iteration,
        next,
    })))
}

const fn end(index: usize) -> Step {
    Step::Done(TaskValue::Round(RoundLink::End { index }))
}
