//! Mock oracle for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Delta;
use crate::domain::ports::Oracle;

/// Combinatorial oracle over the universe `0..size`.
///
/// A subset FAILS when it contains every atom of at least one cause.
#[derive(Debug)]
pub struct MockOracle {
    size: u32,
    causes: Vec<Delta>,
    broken: Option<String>,
    calls: AtomicUsize,
}

impl MockOracle {
    /// An oracle with no cause: everything passes.
    pub const fn new(size: u32) -> Self {
        Self {
            size,
            causes: Vec::new(),
            broken: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An oracle whose every invocation fails to run.
    pub fn broken(size: u32, message: impl Into<String>) -> Self {
        Self {
            broken: Some(message.into()),
            ..Self::new(size)
        }
    }

    /// `count` disjoint causes of `width` atoms each, spread evenly over
    /// the universe.
    pub fn spread(size: u32, count: u32, width: u32) -> Self {
        let count = count.max(1);
        let width = width.max(1);
        let block = size / count;
        let stride = (block / width).max(1);
        (0..count).fold(Self::new(size), |oracle, k| {
            let start = k * block;
            oracle.with_cause((0..width).map(|j| start + j * stride))
        })
    }

    /// Add a cause: subsets holding every atom of `atoms` fail.
    #[must_use]
    pub fn with_cause<I: IntoIterator<Item = u32>>(mut self, atoms: I) -> Self {
        self.causes.push(Delta::from_ids(atoms));
        self
    }

    pub fn causes(&self) -> &[Delta] {
        &self.causes
    }

    /// Number of times the oracle was run.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn search_space(&self) -> Delta {
        Delta::range(self.size)
    }

    async fn test(&self, subset: &Delta) -> DomainResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.broken {
            return Err(DomainError::OracleInvocation(message.clone()));
        }
        Ok(!self.causes.iter().any(|cause| subset.contains_all(cause)))
    }
}
