use tracing::warn;

use super::{done, resolver, NodeContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CorrectWork, Guess, NodeResult, Role, Step};

/// Verify the resolver's structural guess against the sub-searches it ran.
pub(super) async fn correct(ctx: &NodeContext<'_>, work: CorrectWork) -> DomainResult<Step> {
    let CorrectWork {
        guess,
        partition,
        matrix,
        verify,
    } = work;
    let results = ctx.fetch_nodes(&verify).await?;
    ctx.started(Role::Corrector, partition.universe().len(), partition.len());

    let expected = match guess {
        Guess::Single => 1,
        Guess::Pair => 2,
    };
    if results.len() == expected && results.iter().all(NodeResult::is_fail) {
        ctx.decision(Role::Corrector, "guess confirmed");
        return Ok(done(NodeResult::merge(results)));
    }

    let failed = results.iter().filter(|result| result.is_fail()).count();
    let message = format!("{guess:?} guess expected {expected} failing sub-searches, got {failed}");
    if !ctx.search().recover_guess_mismatch {
        return Err(DomainError::AnalysisGuessMismatch(message));
    }

    warn!(guess = ?guess, failed, "{message}; falling back to complement reconstruction");
    ctx.decision(Role::Corrector, "guess refuted");
    resolver::reconstruct(ctx, partition, &matrix).await
}
