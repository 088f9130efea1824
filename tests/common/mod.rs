//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

use std::sync::Arc;

use lockcell::domain::models::{Config, Delta, JobKind, RetryConfig, SearchMode};
use lockcell::domain::ports::Oracle;
use lockcell::services::Lockcell;
use lockcell::DomainResult;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Configuration with a short retry budget so failures surface quickly.
#[allow(dead_code)]
pub fn test_config(mode: SearchMode) -> Config {
    let mut config = Config::default();
    config.search.mode = mode;
    config.retry = RetryConfig {
        max_retries: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
    };
    config
}

/// Run one job to completion and return its result, sorted.
#[allow(dead_code)]
pub async fn search(
    oracle: Arc<dyn Oracle>,
    mode: SearchMode,
    job: JobKind,
) -> DomainResult<Vec<Delta>> {
    let mut lockcell = Lockcell::new(test_config(mode), oracle);
    lockcell.open();
    lockcell.set_job(job)?;
    lockcell.run().await?;
    let result = lockcell.wait().await;
    lockcell.close();
    result.map(sorted)
}

/// Subsets ordered by their atoms, for order-independent comparison.
#[allow(dead_code)]
pub fn sorted(mut subsets: Vec<Delta>) -> Vec<Delta> {
    subsets.sort_by_key(Delta::canonical_key);
    subsets
}

/// Build the expected result from atom id lists.
#[allow(dead_code)]
pub fn subsets(ids: &[&[u32]]) -> Vec<Delta> {
    sorted(
        ids.iter()
            .map(|atoms| Delta::from_ids(atoms.iter().copied()))
            .collect(),
    )
}

/// Both search modes, for tests that must hold in each.
#[allow(dead_code)]
pub const MODES: [SearchMode; 2] = [SearchMode::Default, SearchMode::Analyse];
