use tracing::{debug, info};

use super::fetcher::ResultFetcher;
use super::{finished, settle, Progress};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Delta, RoundLink, RoundWork, TaskHandle, WorkItem};
use crate::domain::ports::TaskState;

/// Position of the job along the round chain.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// Waiting for the link under this handle.
    Link(TaskHandle),
    /// Link resolved; waiting for its iteration.
    Iteration {
        iteration: TaskHandle,
        next: TaskHandle,
    },
    /// Iteration collected; waiting for the next link.
    Collected { next: TaskHandle },
}

/// Rounds chained until the remaining universe stops failing.
///
/// The job follows the chain link by link. Each completed iteration delivers
/// its subsets, shrinks the remaining universe and counts as one step; the
/// next link is only followed once it is ready.
#[derive(Debug)]
pub struct RddMinJob {
    remaining: Delta,
    progress: Progress,
    root: Option<TaskHandle>,
    cursor: Option<Cursor>,
    step: usize,
}

impl RddMinJob {
    /// A chain whose first round searches all of `universe`.
    pub fn new(universe: Delta) -> Self {
        Self {
            remaining: universe,
            progress: Progress::new(),
            root: None,
            cursor: None,
            step: 0,
        }
    }

    /// Atoms not yet part of a found subset.
    pub const fn remaining(&self) -> &Delta {
        &self.remaining
    }

    pub const fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    pub const fn root(&self) -> Option<TaskHandle> {
        self.root
    }

    /// Iterations collected so far.
    pub const fn step(&self) -> usize {
        self.step
    }

    /// Submit round 0 over the remaining universe.
    ///
    /// # Errors
    /// Returns submission errors of the substrate.
    pub async fn start(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        let root = fetcher
            .substrate()
            .invoke(
                WorkItem::Round(RoundWork {
                    universe: self.remaining.clone(),
                    previous: None,
                    index: 0,
                }),
                None,
            )
            .await?;
        info!(%root, atoms = self.remaining.len(), "rddmin job started");
        self.root = Some(root);
        self.cursor = Some(Cursor::Link(root));
        self.progress.start()
    }

    /// Follow the chain as far as completed units allow. Returns whether new
    /// subsets arrived or the status changed.
    ///
    /// # Errors
    /// Returns retrieval errors; the cursor stays on the unit that could not
    /// be read.
    pub async fn poll(&mut self, fetcher: &ResultFetcher) -> DomainResult<bool> {
        if !self.progress.status().is_active() {
            return Ok(false);
        }
        let before = self.progress.status();
        let mut arrived = 0;

        loop {
            let cursor = self.cursor()?;
            let pending = match cursor {
                Cursor::Link(handle) | Cursor::Collected { next: handle } => handle,
                Cursor::Iteration { iteration, .. } => iteration,
            };

            match fetcher.state(pending).await? {
                TaskState::Pending => break,
                TaskState::Failed(err) => {
                    self.progress.fail(err)?;
                    break;
                }
                TaskState::Completed => {}
            }

            match cursor {
                Cursor::Link(handle) => match fetcher.fetch(handle).await?.into_round()? {
                    RoundLink::End { index } => {
                        info!(round = index, steps = self.step, "round chain ended");
                        self.progress.complete()?;
                        break;
                    }
                    RoundLink::Step {
                        index,
                        iteration,
                        next,
                    } => {
                        debug!(round = index, %iteration, "following round link");
                        self.cursor = Some(Cursor::Iteration { iteration, next });
                    }
                },
                Cursor::Iteration { iteration, next } => {
                    let found = fetcher.fetch(iteration).await?.into_node()?.into_found();
                    self.remaining = self.remaining.minus_all(&found);
                    arrived += self.progress.publish(found)?;
                    self.step += 1;
                    debug!(
                        step = self.step,
                        remaining = self.remaining.len(),
                        "round iteration collected"
                    );
                    self.cursor = Some(Cursor::Collected { next });
                }
                Cursor::Collected { next } => self.cursor = Some(Cursor::Link(next)),
            }
        }

        Ok(arrived > 0 || self.progress.status() != before)
    }

    /// Follow the chain until the job is terminal.
    pub async fn wait(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        while self.progress.status().is_active() {
            let pending = match self.cursor()? {
                Cursor::Link(handle) | Cursor::Collected { next: handle } => handle,
                Cursor::Iteration { iteration, .. } => iteration,
            };
            settle(fetcher, pending).await?;
            self.poll(fetcher).await?;
        }
        finished(&self.progress)
    }

    fn cursor(&self) -> DomainResult<Cursor> {
        self.cursor
            .ok_or_else(|| DomainError::Precondition("job has not been started".to_string()))
    }
}
