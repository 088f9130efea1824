//! End-to-end properties of the decomposition engine.

mod common;

use std::sync::Arc;

use common::{search, sorted, subsets, MODES};
use lockcell::adapters::oracles::MockOracle;
use lockcell::adapters::substrates::LocalSubstrate;
use lockcell::adapters::trace::RecordingTraceSink;
use lockcell::domain::models::{
    ConflictMatrix, CorrectWork, Delta, FailingSets, Granularity, Guess, JobKind, NodeResult, Partition,
    Role, SearchConfig, SearchMode, TaskValue, TestWork, WorkItem,
};
use lockcell::domain::ports::Substrate;
use lockcell::services::engine::DecompositionEngine;
use lockcell::services::RetryPolicy;
use lockcell::DomainError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_passing_universe_returns_nothing() {
    for mode in MODES {
        let oracle = Arc::new(MockOracle::new(16));
        let result = search(oracle.clone(), mode, JobKind::DdMin)
            .await
            .expect("search should complete");

        assert!(result.is_empty(), "{mode}: nothing should be found");
        assert!(oracle.calls() <= 16, "{mode}: at most one call per atom");
        assert_eq!(oracle.calls(), 1, "{mode}: a passing universe is tested once");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_cause_is_isolated_exactly() {
    for mode in MODES {
        let oracle = Arc::new(MockOracle::new(8).with_cause([3]));
        let result = search(oracle, mode, JobKind::DdMin)
            .await
            .expect("search should complete");
        assert_eq!(result, subsets(&[&[3]]), "{mode}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disjoint_singletons_found_in_one_round() {
    for mode in MODES {
        let oracle = Arc::new(MockOracle::new(16).with_cause([2]).with_cause([9]));
        let result = search(oracle, mode, JobKind::DdMin)
            .await
            .expect("search should complete");
        assert_eq!(result, subsets(&[&[2], &[9]]), "{mode}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interacting_pair_across_halves() {
    for mode in MODES {
        let oracle = Arc::new(MockOracle::new(64).with_cause([0, 32]));
        let result = search(oracle, mode, JobKind::DdMin)
            .await
            .expect("search should complete");
        assert_eq!(result, subsets(&[&[0, 32]]), "{mode}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_analyse_mode_reasons_over_complements() {
    let trace = Arc::new(RecordingTraceSink::new());
    let oracle = Arc::new(MockOracle::new(64).with_cause([0, 32]));
    let engine = DecompositionEngine::new(
        oracle,
        SearchConfig {
            mode: SearchMode::Analyse,
            recover_guess_mismatch: true,
        },
    )
    .with_trace_sink(trace.clone());
    let substrate = LocalSubstrate::new(Arc::new(engine), 8);

    let root = substrate
        .invoke(
            WorkItem::Test(TestWork::recurse(Delta::range(64), Granularity::Split(2))),
            None,
        )
        .await
        .expect("invoke");
    let result = substrate.wait(root).await.expect("value").into_node().expect("node");

    assert_eq!(result.found(), &[Delta::from_ids([0, 32])]);
    assert!(trace.nodes(Role::Analyser) >= 1);
    assert!(trace.nodes(Role::Resolver) >= 1);
    assert!(trace.nodes(Role::Corrector) >= 1);
    assert!(trace.oracle_calls() > 0);
}

#[test]
fn test_same_subset_from_two_branches_is_kept_once() {
    let merged = NodeResult::merge([
        NodeResult::Failed(vec![Delta::from_ids([4, 1])]),
        NodeResult::Failed(vec![Delta::from_ids([1, 4]), Delta::from_ids([7])]),
        NodeResult::Passed,
    ]);
    let found = merged.into_found();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0], Delta::from_ids([4, 1]), "first discovery is kept");
    assert_eq!(found[1], Delta::from_ids([7]));

    let mut sets = FailingSets::new();
    assert!(sets.insert(Delta::from_ids([3, 2])));
    assert!(!sets.insert(Delta::from_ids([2, 3])));
    assert_eq!(sets.len(), 1);
}

/// Corrector fixture: the universe `0..8` split into four pairs, with the
/// cause `{1, 3}` spanning parts 0 and 1. The matrix records the true
/// complement outcomes, while the single-cause guess is verified against a
/// sub-search that passes, so the guess is refuted.
async fn refuted_guess(recover: bool) -> Result<TaskValue, DomainError> {
    let oracle = Arc::new(MockOracle::new(8).with_cause([1, 3]));
    let engine = DecompositionEngine::new(
        oracle,
        SearchConfig {
            mode: SearchMode::Analyse,
            recover_guess_mismatch: recover,
        },
    )
    .with_retry(RetryPolicy::new(1, 1, 2));
    let substrate = LocalSubstrate::new(Arc::new(engine), 4);

    let partition = Partition::contiguous(&Delta::range(8), 4);
    let mut matrix = ConflictMatrix::new(4);
    for i in 2..4 {
        for j in 2..4 {
            matrix.set_still_fails(i, j, true);
        }
    }

    let verify = substrate
        .invoke(WorkItem::Test(TestWork::probe(Delta::from_ids([6, 7]))), None)
        .await
        .expect("invoke");
    let correct = substrate
        .invoke(
            WorkItem::Correct(CorrectWork {
                guess: Guess::Single,
                partition,
                matrix,
                verify: vec![verify],
            }),
            None,
        )
        .await
        .expect("invoke");
    substrate.wait(correct).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refuted_guess_falls_back_to_reconstruction() {
    let value = refuted_guess(true).await.expect("fallback should succeed");
    let found = value.into_node().expect("node").into_found();
    assert_eq!(sorted(found), subsets(&[&[1, 3]]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refuted_guess_is_fatal_without_recovery() {
    let err = refuted_guess(false).await.expect_err("guess mismatch should fail");
    assert!(matches!(err, DomainError::AnalysisGuessMismatch(_)));
}
