use tracing::{debug, info};

use super::fetcher::ResultFetcher;
use super::tasks_finder::TasksFinder;
use super::{finished, settle, Progress};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Delta, Granularity, TaskHandle, TaskTag, TestWork, WorkItem};
use crate::domain::ports::TaskState;

/// Single decomposition round over the whole search space.
///
/// Subsets thrown early by the engine reach the client through the
/// [`TaskTag::Thrown`] completion log; the root value carries the final
/// answer.
#[derive(Debug)]
pub struct DdMinJob {
    universe: Delta,
    progress: Progress,
    root: Option<TaskHandle>,
    thrown: TasksFinder,
}

impl DdMinJob {
    /// A job over `universe` that lists thrown subsets `page_size` at a time.
    pub fn new(universe: Delta, page_size: usize) -> Self {
        Self {
            universe,
            progress: Progress::new(),
            root: None,
            thrown: TasksFinder::new(TaskTag::Thrown, page_size),
        }
    }

    pub const fn universe(&self) -> &Delta {
        &self.universe
    }

    pub const fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    /// Handle of the root test, once started.
    pub const fn root(&self) -> Option<TaskHandle> {
        self.root
    }

    /// Submit the root test over the whole universe.
    ///
    /// Thrown subsets left in the log by earlier jobs of the session are
    /// skipped.
    ///
    /// # Errors
    /// Returns listing or submission errors of the substrate.
    pub async fn start(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        self.thrown.skip_existing(fetcher).await?;
        let root = fetcher
            .substrate()
            .invoke(
                WorkItem::Test(TestWork::recurse(
                    self.universe.clone(),
                    Granularity::Split(2),
                )),
                Some(TaskTag::Root),
            )
            .await?;
        info!(%root, atoms = self.universe.len(), "ddmin job started");
        self.root = Some(root);
        self.progress.start()
    }

    /// Collect newly thrown subsets, then check the root. Returns whether
    /// anything changed.
    ///
    /// # Errors
    /// Returns retrieval errors. A thrown subset whose value could not be
    /// read is collected on the next poll.
    pub async fn poll(&mut self, fetcher: &ResultFetcher) -> DomainResult<bool> {
        if !self.progress.status().is_active() {
            return Ok(false);
        }
        let root = self.root_handle()?;
        let before = self.progress.status();
        let mut arrived = 0;

        self.thrown.refresh(fetcher).await?;
        while let Some(handle) = self.thrown.next_pending().map(|task| task.handle) {
            let subsets = fetcher.fetch(handle).await?.into_subsets()?;
            let added = self.progress.publish(subsets)?;
            self.thrown.acknowledge();
            debug!(%handle, added, "collected thrown subsets");
            arrived += added;
        }

        match fetcher.state(root).await? {
            TaskState::Pending => {}
            TaskState::Completed => {
                let result = fetcher.fetch(root).await?.into_node()?;
                arrived += self.progress.publish(result.into_found())?;
                self.progress.complete()?;
            }
            TaskState::Failed(err) => self.progress.fail(err)?,
        }

        Ok(arrived > 0 || self.progress.status() != before)
    }

    /// Poll until the job is terminal.
    pub async fn wait(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        let root = self.root_handle()?;
        while self.progress.status().is_active() {
            settle(fetcher, root).await?;
            self.poll(fetcher).await?;
        }
        finished(&self.progress)
    }

    fn root_handle(&self) -> DomainResult<TaskHandle> {
        self.root
            .ok_or_else(|| DomainError::Precondition("job has not been started".to_string()))
    }
}
