//! Round chaining: each round searches what the previous rounds left.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{search, sorted, subsets, test_config, MODES};
use lockcell::adapters::oracles::MockOracle;
use lockcell::domain::models::{Delta, JobKind, JobStatus, SearchMode};
use lockcell::services::Lockcell;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chain_matches_single_round_for_independent_causes() {
    for mode in MODES {
        let oracle = || Arc::new(MockOracle::new(16).with_cause([2]).with_cause([9]));
        let single = search(oracle(), mode, JobKind::DdMin).await.expect("ddmin");
        let chained = search(oracle(), mode, JobKind::RddMin).await.expect("rddmin");

        assert_eq!(single, subsets(&[&[2], &[9]]), "{mode}");
        assert_eq!(chained, single, "{mode}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_later_rounds_find_causes_masked_by_earlier_ones() {
    // {1} fails the lower half, so the first round never looks at {0, 32}.
    let oracle = || Arc::new(MockOracle::new(64).with_cause([1]).with_cause([0, 32]));

    let single = search(oracle(), SearchMode::Default, JobKind::DdMin)
        .await
        .expect("ddmin");
    assert_eq!(single, subsets(&[&[1]]));

    let chained = search(oracle(), SearchMode::Default, JobKind::RddMin)
        .await
        .expect("rddmin");
    assert_eq!(chained, subsets(&[&[0, 32], &[1]]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_universe_shrinks_monotonically() {
    let causes: [&[u32]; 3] = [&[3], &[17], &[40, 41]];
    let oracle = causes
        .iter()
        .fold(MockOracle::new(48), |oracle, cause| oracle.with_cause(cause.iter().copied()));
    let mut lockcell = Lockcell::new(test_config(SearchMode::Default), Arc::new(oracle));
    lockcell.open();
    lockcell.run_rddmin().await.expect("run");

    let universe = Delta::range(48);
    let mut sizes = vec![lockcell.search_space().len()];
    let mut streamed = Vec::new();
    while !lockcell.status().is_terminal() {
        if lockcell.update().await.expect("update") {
            streamed.extend(lockcell.get_update().expect("drain"));
        }
        sizes.push(lockcell.search_space().len());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    streamed.extend(lockcell.get_update().expect("drain"));

    assert_eq!(lockcell.status(), JobStatus::Completed);
    assert!(sizes.windows(2).all(|pair| pair[1] <= pair[0]));

    let result = lockcell.get_result().expect("result");
    assert_eq!(sorted(streamed), sorted(result.clone()));
    assert_eq!(lockcell.search_space(), &universe.minus_all(&result));
    assert!(lockcell.step() <= universe.len());
    assert!(lockcell.step() >= 2, "the chain ends with a passing round");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chain_ends_when_nothing_is_left() {
    let mut lockcell = Lockcell::new(
        test_config(SearchMode::Default),
        Arc::new(MockOracle::new(1).with_cause([0])),
    );
    lockcell.open();
    lockcell.run_rddmin().await.expect("run");

    assert_eq!(lockcell.wait().await.expect("wait"), subsets(&[&[0]]));
    assert!(lockcell.search_space().is_empty());
    assert_eq!(lockcell.step(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_passing_universe_ends_after_one_round() {
    let mut lockcell = Lockcell::new(
        test_config(SearchMode::Analyse),
        Arc::new(MockOracle::new(32)),
    );
    lockcell.open();
    lockcell.run_rddmin().await.expect("run");

    assert!(lockcell.wait().await.expect("wait").is_empty());
    assert_eq!(lockcell.step(), 1);
    assert_eq!(lockcell.search_space().len(), 32);
}
