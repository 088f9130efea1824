//! Oracle port - the black-box predicate the search minimises against.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Delta;

/// A deterministic binary test over subsets of a universe.
///
/// `test` returns `true` when the subset PASSES. The search assumes that the
/// full universe fails and that a subset of a passing subset also passes.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Oracle type name, used in logs.
    fn name(&self) -> &'static str;

    /// The ordered universe the oracle is defined over.
    fn search_space(&self) -> Delta;

    /// Run the test on a subset of the universe.
    ///
    /// Failing to run the test at all (as opposed to the test failing) is an
    /// `OracleInvocation` error.
    async fn test(&self, subset: &Delta) -> DomainResult<bool>;
}
