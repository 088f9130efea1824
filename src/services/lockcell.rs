//! Client facade: sessions, jobs and the status protocol.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::substrates::SubstrateRegistry;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, Delta, JobKind, JobStatus};
use crate::domain::ports::{NullTraceSink, Oracle, Substrate, SubstrateFactory, TraceSink};
use crate::services::engine::DecompositionEngine;
use crate::services::jobs::{Job, ResultFetcher};
use crate::services::retry::RetryPolicy;

struct Session {
    substrate: Arc<dyn Substrate>,
    fetcher: ResultFetcher,
}

/// Entry point for running searches against one oracle.
///
/// The client owns the job status exclusively: it only changes while the
/// client polls. A typical run opens a session, starts a job, then either
/// polls with [`Lockcell::update`] and [`Lockcell::get_update`] or blocks on
/// [`Lockcell::wait`].
///
/// ```ignore
/// let mut lockcell = Lockcell::new(Config::default(), oracle);
/// lockcell.open();
/// lockcell.run_rddmin().await?;
/// let causes = lockcell.wait().await?;
/// ```
pub struct Lockcell {
    config: Config,
    oracle: Arc<dyn Oracle>,
    factory: Arc<dyn SubstrateFactory>,
    trace: Arc<dyn TraceSink>,
    search_space: Delta,
    session: Option<Session>,
    job: Option<Job>,
}

impl Lockcell {
    /// Create a client with no session and no job.
    ///
    /// # Arguments
    /// * `config` - Search, substrate and retry settings
    /// * `oracle` - Oracle whose search space every job runs over
    pub fn new(config: Config, oracle: Arc<dyn Oracle>) -> Self {
        let factory = Arc::new(SubstrateRegistry::new(config.substrate.clone()));
        let search_space = oracle.search_space();
        Self {
            config,
            oracle,
            factory,
            trace: Arc::new(NullTraceSink::new()),
            search_space,
            session: None,
            job: None,
        }
    }

    /// Use `factory` instead of the configured substrate backend.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn SubstrateFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Record every engine decision of the next session into `trace`.
    #[must_use]
    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration. Only allowed while no session is open.
    ///
    /// # Errors
    /// Returns `Precondition` if a session is open.
    pub fn set_config(&mut self, config: Config) -> DomainResult<()> {
        if self.is_open() {
            return Err(DomainError::Precondition(
                "cannot change configuration while a session is open".to_string(),
            ));
        }
        self.config = config;
        Ok(())
    }

    pub fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    /// Open a substrate session, or return the one already open.
    ///
    /// The engine of the session is built from the current configuration,
    /// so later configuration changes need a new session.
    #[instrument(skip(self))]
    pub fn open(&mut self) -> Uuid {
        if let Some(session) = &self.session {
            return session.substrate.session_id();
        }

        let retry = RetryPolicy::from(&self.config.retry);
        let engine = DecompositionEngine::new(Arc::clone(&self.oracle), self.config.search.clone())
            .with_retry(retry)
            .with_trace_sink(Arc::clone(&self.trace));
        let substrate = self.factory.create(Arc::new(engine));
        let id = substrate.session_id();
        info!(
            session = %id,
            substrate = substrate.name(),
            oracle = self.oracle.name(),
            "session opened"
        );

        self.session = Some(Session {
            fetcher: ResultFetcher::new(Arc::clone(&substrate), retry),
            substrate,
        });
        id
    }

    /// Close the session. A job still running can no longer be polled.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if self.status().is_active() {
                warn!(session = %session.substrate.session_id(), "closing session with a running job");
            }
            info!(session = %session.substrate.session_id(), "session closed");
        }
    }

    /// Whether a session is open.
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Identifier of the open session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session
            .as_ref()
            .map(|session| session.substrate.session_id())
    }

    /// Every job kind [`Lockcell::set_job`] accepts.
    pub const fn valid_jobs() -> &'static [JobKind] {
        &[JobKind::DdMin, JobKind::RddMin]
    }

    /// Prepare a job over the full search space. Rejected while another job
    /// is running.
    ///
    /// # Arguments
    /// * `kind` - Single decomposition or round chain
    ///
    /// # Errors
    /// Returns `Precondition` if the current job is still active.
    pub fn set_job(&mut self, kind: JobKind) -> DomainResult<()> {
        if self.status().is_active() {
            return Err(DomainError::Precondition(format!(
                "a {} job is still running",
                self.job.as_ref().map_or("previous", |job| job.kind().as_str())
            )));
        }
        self.job = Some(Job::new(
            kind,
            self.search_space.clone(),
            self.config.substrate.page_size,
        ));
        info!(job = %kind, atoms = self.search_space.len(), "job created");
        Ok(())
    }

    /// [`Lockcell::set_job`] by job name (`ddmin` or `rddmin`).
    ///
    /// # Errors
    /// Returns `Precondition` for an unknown name or an active job.
    pub fn set_job_by_name(&mut self, name: &str) -> DomainResult<()> {
        self.set_job(name.parse()?)
    }

    /// Start the prepared job.
    ///
    /// # Errors
    /// Returns `Precondition` without an open session, without a job, or
    /// when the job was already started. Submission errors of the substrate
    /// are returned as they are.
    pub async fn run(&mut self) -> DomainResult<()> {
        let session = self.session.as_ref().ok_or_else(closed)?;
        let job = self.job.as_mut().ok_or_else(no_job)?;
        if job.progress().status() != JobStatus::JobCreated {
            return Err(DomainError::Precondition(format!(
                "job is {}, call set_job before running again",
                job.progress().status()
            )));
        }
        job.start(&session.fetcher).await
    }

    /// Set and start a single decomposition.
    pub async fn run_ddmin(&mut self) -> DomainResult<()> {
        self.set_job(JobKind::DdMin)?;
        self.run().await
    }

    /// Set and start a round chain.
    pub async fn run_rddmin(&mut self) -> DomainResult<()> {
        self.set_job(JobKind::RddMin)?;
        self.run().await
    }

    /// Non-blocking poll. Returns whether new data arrived or the status
    /// changed.
    ///
    /// A job that already reached a terminal status is not polled again.
    ///
    /// # Errors
    /// Returns `Precondition` without a job, or without a session while the
    /// job is active. Retrieval errors that outlast the retry policy are
    /// returned without failing the job.
    pub async fn update(&mut self) -> DomainResult<bool> {
        let job = self.job.as_mut().ok_or_else(no_job)?;
        if !job.progress().status().is_active() {
            return Ok(false);
        }
        let session = self.session.as_ref().ok_or_else(closed)?;
        job.poll(&session.fetcher).await
    }

    /// Drain the subsets found since the last call.
    ///
    /// # Errors
    /// Returns `Precondition` without a job.
    pub fn get_update(&mut self) -> DomainResult<Vec<Delta>> {
        self.job.as_mut().ok_or_else(no_job)?.progress_mut().drain()
    }

    /// Poll, then report the status.
    ///
    /// # Errors
    /// Same as [`Lockcell::update`].
    pub async fn get_status(&mut self) -> DomainResult<JobStatus> {
        self.update().await?;
        Ok(self.status())
    }

    /// Status as of the last poll.
    pub fn status(&self) -> JobStatus {
        self.job
            .as_ref()
            .map_or(JobStatus::NoJob, |job| job.progress().status())
    }

    /// Every subset found by a completed job.
    ///
    /// # Errors
    /// Returns `Precondition` unless the job status is `Completed`.
    pub fn get_result(&self) -> DomainResult<Vec<Delta>> {
        match self.job.as_ref() {
            Some(job) if job.progress().status() == JobStatus::Completed => {
                Ok(job.progress().results().to_vec())
            }
            _ => Err(DomainError::Precondition(format!(
                "no result available while job status is {}",
                self.status()
            ))),
        }
    }

    /// Block until the job completes and return its result.
    ///
    /// # Errors
    /// Returns `Precondition` without a job or before it was started, and
    /// the job's own error when it failed.
    pub async fn wait(&mut self) -> DomainResult<Vec<Delta>> {
        let job = self.job.as_mut().ok_or_else(no_job)?;
        if job.progress().status() == JobStatus::JobCreated {
            return Err(DomainError::Precondition("job has not been started".to_string()));
        }
        if job.progress().status().is_active() {
            let session = self.session.as_ref().ok_or_else(closed)?;
            job.wait(&session.fetcher).await?;
        }
        if let Some(err) = job.progress().error() {
            return Err(err.clone());
        }
        self.get_result()
    }

    /// Completed round iterations of the current job.
    pub fn step(&self) -> usize {
        self.job.as_ref().map_or(0, Job::step)
    }

    /// Error of a failed job.
    pub fn last_error(&self) -> Option<&DomainError> {
        self.job.as_ref().and_then(|job| job.progress().error())
    }

    /// Atoms still under search: the whole space before a job starts, the
    /// shrinking remainder during a round chain.
    pub fn search_space(&self) -> &Delta {
        self.job
            .as_ref()
            .map_or(&self.search_space, Job::remaining)
    }

    /// Kind of the current job, if one was set.
    pub fn job_kind(&self) -> Option<JobKind> {
        self.job.as_ref().map(Job::kind)
    }
}

fn closed() -> DomainError {
    DomainError::Precondition("session is not open".to_string())
}

fn no_job() -> DomainError {
    DomainError::Precondition("no job has been set".to_string())
}
