//! Property tests for the decomposition over random independent causes.

mod common;

use std::sync::Arc;

use common::{search, subsets};
use lockcell::adapters::oracles::MockOracle;
use lockcell::domain::models::{JobKind, SearchMode};
use proptest::prelude::*;
use proptest::sample::subsequence;
use proptest::test_runner::TestCaseError;

/// A universe size together with up to four distinct singleton causes in it.
fn singleton_causes() -> impl Strategy<Value = (u32, Vec<u32>)> {
    (8u32..48).prop_flat_map(|size| {
        let atoms: Vec<u32> = (0..size).collect();
        (Just(size), subsequence(atoms, 1..=4))
    })
}

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: every independent singleton cause is found, and nothing else
    ///
    /// Singleton causes never mask each other, so a single round already
    /// finds all of them and the chained search agrees with it.
    #[test]
    fn prop_singleton_causes_are_found_exactly(
        (size, causes) in singleton_causes(),
        analyse in any::<bool>(),
    ) {
        let mode = if analyse { SearchMode::Analyse } else { SearchMode::Default };
        let expected: Vec<&[u32]> = causes.iter().map(std::slice::from_ref).collect();
        let expected = subsets(&expected);
        let oracle = || {
            Arc::new(
                causes
                    .iter()
                    .fold(MockOracle::new(size), |oracle, &atom| oracle.with_cause([atom])),
            )
        };

        let runtime = runtime()?;
        for job in [JobKind::DdMin, JobKind::RddMin] {
            let found = runtime
                .block_on(search(oracle(), mode, job))
                .map_err(|e| TestCaseError::fail(format!("{job} in {mode}: {e}")))?;
            prop_assert_eq!(&found, &expected, "{} in {}", job, mode);
        }
    }

    /// Property: the oracle is never called more than twice per atom for a
    /// single cause
    #[test]
    fn prop_single_cause_call_count_is_bounded(
        size in 2u32..64,
        seed in any::<u32>(),
    ) {
        let atom = seed % size;
        let oracle = Arc::new(MockOracle::new(size).with_cause([atom]));

        let runtime = runtime()?;
        let found = runtime
            .block_on(search(oracle.clone(), SearchMode::Default, JobKind::DdMin))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(found, subsets(&[&[atom]]));
        prop_assert!(oracle.calls() <= 2 * size as usize);
    }
}
