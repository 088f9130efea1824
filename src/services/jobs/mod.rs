//! Client-side job handlers.
//!
//! A job submits its root work to a substrate session and then tracks the
//! results as they complete, without blocking. Both job kinds share the
//! [`Progress`] record behind the client status protocol.

pub mod ddmin;
pub mod fetcher;
pub mod rddmin;
pub mod tasks_finder;

pub use ddmin::DdMinJob;
pub use fetcher::ResultFetcher;
pub use rddmin::RddMinJob;
pub use tasks_finder::TasksFinder;

use tracing::{error, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Delta, FailingSets, JobKind, JobStatus, TaskHandle};

/// Status, accumulated results and pending updates of one job.
#[derive(Debug, Clone)]
pub struct Progress {
    status: JobStatus,
    results: FailingSets,
    buffer: Vec<Delta>,
    error: Option<DomainError>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// A created job with nothing found yet.
    pub fn new() -> Self {
        Self {
            status: JobStatus::JobCreated,
            results: FailingSets::new(),
            buffer: Vec::new(),
            error: None,
        }
    }

    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Every subset found so far, without duplicates.
    pub fn results(&self) -> &[Delta] {
        self.results.as_slice()
    }

    pub const fn error(&self) -> Option<&DomainError> {
        self.error.as_ref()
    }

    /// Subsets found but not drained yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn start(&mut self) -> DomainResult<()> {
        self.status.transition_to(JobStatus::Running)
    }

    /// Record subsets, keeping only those not seen before. Returns how many
    /// were new; new subsets mark the job as UPDATED.
    pub(crate) fn publish(&mut self, subsets: Vec<Delta>) -> DomainResult<usize> {
        let fresh = self.results.extend_new(subsets);
        let count = fresh.len();
        if count > 0 {
            self.buffer.extend(fresh);
            if self.status == JobStatus::Running {
                self.status.transition_to(JobStatus::Updated)?;
            }
        }
        Ok(count)
    }

    pub(crate) fn complete(&mut self) -> DomainResult<()> {
        self.status.transition_to(JobStatus::Completed)?;
        info!(found = self.results.len(), "job completed");
        Ok(())
    }

    pub(crate) fn fail(&mut self, err: DomainError) -> DomainResult<()> {
        error!(error = %err, "job failed");
        self.status.transition_to(JobStatus::Failed)?;
        self.error = Some(err);
        Ok(())
    }

    /// Hand over the buffered subsets, dropping an UPDATED status back to
    /// RUNNING.
    pub(crate) fn drain(&mut self) -> DomainResult<Vec<Delta>> {
        if self.status == JobStatus::Updated {
            self.status.transition_to(JobStatus::Running)?;
        }
        Ok(std::mem::take(&mut self.buffer))
    }
}

/// A job of either kind.
#[derive(Debug)]
pub enum Job {
    DdMin(DdMinJob),
    RddMin(RddMinJob),
}

impl Job {
    /// A job of `kind` over `universe`, not yet started.
    ///
    /// # Arguments
    /// * `kind` - Job kind
    /// * `universe` - Atoms the job searches
    /// * `page_size` - Page size for listing thrown subsets
    pub fn new(kind: JobKind, universe: Delta, page_size: usize) -> Self {
        match kind {
            JobKind::DdMin => Self::DdMin(DdMinJob::new(universe, page_size)),
            JobKind::RddMin => Self::RddMin(RddMinJob::new(universe)),
        }
    }

    pub const fn kind(&self) -> JobKind {
        match self {
            Self::DdMin(_) => JobKind::DdMin,
            Self::RddMin(_) => JobKind::RddMin,
        }
    }

    pub const fn progress(&self) -> &Progress {
        match self {
            Self::DdMin(job) => job.progress(),
            Self::RddMin(job) => job.progress(),
        }
    }

    pub fn progress_mut(&mut self) -> &mut Progress {
        match self {
            Self::DdMin(job) => job.progress_mut(),
            Self::RddMin(job) => job.progress_mut(),
        }
    }

    /// Handle of the root submission, once started.
    pub const fn root(&self) -> Option<TaskHandle> {
        match self {
            Self::DdMin(job) => job.root(),
            Self::RddMin(job) => job.root(),
        }
    }

    /// Completed round iterations; always 0 for a single-round job.
    pub const fn step(&self) -> usize {
        match self {
            Self::DdMin(_) => 0,
            Self::RddMin(job) => job.step(),
        }
    }

    /// Atoms still under search.
    pub const fn remaining(&self) -> &Delta {
        match self {
            Self::DdMin(job) => job.universe(),
            Self::RddMin(job) => job.remaining(),
        }
    }

    /// Submit the root work of the job.
    ///
    /// # Errors
    /// Returns submission or listing errors of the substrate.
    pub async fn start(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        match self {
            Self::DdMin(job) => job.start(fetcher).await,
            Self::RddMin(job) => job.start(fetcher).await,
        }
    }

    /// Collect whatever completed since the last poll. Returns whether the
    /// client-visible state changed.
    pub async fn poll(&mut self, fetcher: &ResultFetcher) -> DomainResult<bool> {
        match self {
            Self::DdMin(job) => job.poll(fetcher).await,
            Self::RddMin(job) => job.poll(fetcher).await,
        }
    }

    /// Block until the job reaches a terminal status.
    pub async fn wait(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        match self {
            Self::DdMin(job) => job.wait(fetcher).await,
            Self::RddMin(job) => job.wait(fetcher).await,
        }
    }
}

/// Wait for `handle` to settle without treating a failed unit as an error.
///
/// Only retrieval failures surface here; a failed unit is picked up by the
/// next poll and recorded on the job.
pub(crate) async fn settle(fetcher: &ResultFetcher, handle: TaskHandle) -> DomainResult<()> {
    match fetcher.fetch(handle).await {
        Err(err @ (DomainError::RetrievalExhausted { .. } | DomainError::UnknownHandle(_))) => {
            Err(err)
        }
        Ok(_) | Err(_) => Ok(()),
    }
}

/// Result of a terminal job, or the error it failed with.
pub(crate) fn finished(progress: &Progress) -> DomainResult<()> {
    match (progress.status(), progress.error()) {
        (JobStatus::Failed, Some(err)) => Err(err.clone()),
        (JobStatus::Failed, None) => Err(DomainError::Substrate("job failed".to_string())),
        _ => Ok(()),
    }
}
