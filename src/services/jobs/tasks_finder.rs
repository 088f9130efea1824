use std::collections::VecDeque;

use super::fetcher::ResultFetcher;
use crate::domain::errors::DomainResult;
use crate::domain::models::TaskTag;
use crate::domain::ports::CompletedTask;

/// Cursor over the completion log of one tag.
///
/// Listing and consuming are separate steps: [`refresh`](Self::refresh)
/// moves newly completed tasks into a backlog, and a task leaves the backlog
/// only once the caller [acknowledges](Self::acknowledge) it. A task whose
/// value could not be read stays at the front for the next poll.
#[derive(Debug, Clone)]
pub struct TasksFinder {
    tag: TaskTag,
    page_size: usize,
    listed: usize,
    pending: VecDeque<CompletedTask>,
}

impl TasksFinder {
    /// A cursor at the start of the log of `tag`.
    pub fn new(tag: TaskTag, page_size: usize) -> Self {
        Self {
            tag,
            page_size: page_size.max(1),
            listed: 0,
            pending: VecDeque::new(),
        }
    }

    /// Number of log entries listed so far, acknowledged or not.
    pub const fn seen(&self) -> usize {
        self.listed
    }

    /// Number of listed tasks not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Move the cursor past every task already completed.
    pub async fn skip_existing(&mut self, fetcher: &ResultFetcher) -> DomainResult<()> {
        self.listed = fetcher
            .list_completed(self.tag, 0, self.page_size)
            .await?
            .total;
        self.pending.clear();
        Ok(())
    }

    /// List the tasks completed since the last refresh and queue them,
    /// walking forward page by page while pages come back full. Returns how
    /// many were queued.
    ///
    /// # Errors
    ///
    /// Returns the listing error of the first page that could not be read.
    /// Pages read before it stay queued.
    pub async fn refresh(&mut self, fetcher: &ResultFetcher) -> DomainResult<usize> {
        let mut queued = 0;
        loop {
            let page = self.listed / self.page_size;
            let offset = self.listed % self.page_size;
            let result = fetcher
                .list_completed(self.tag, page, self.page_size)
                .await?;
            let full = result.tasks.len() == self.page_size;
            let before = self.pending.len();
            self.pending.extend(result.tasks.into_iter().skip(offset));
            let fresh = self.pending.len() - before;
            self.listed += fresh;
            queued += fresh;

            if !full || fresh == 0 {
                break;
            }
        }
        Ok(queued)
    }

    /// Oldest task not yet acknowledged.
    pub fn next_pending(&self) -> Option<&CompletedTask> {
        self.pending.front()
    }

    /// Drop the oldest pending task once its value has been consumed.
    pub fn acknowledge(&mut self) -> Option<CompletedTask> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::oracles::MockOracle;
    use crate::adapters::substrates::LocalSubstrate;
    use crate::domain::errors::DomainError;
    use crate::domain::models::{Delta, EmitWork, SearchConfig, TaskHandle, TaskValue, WorkItem};
    use crate::domain::ports::{Substrate, TaskPage, TaskState};
    use crate::services::engine::DecompositionEngine;
    use crate::services::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    fn local() -> LocalSubstrate {
        let engine = DecompositionEngine::new(Arc::new(MockOracle::new(4)), SearchConfig::default());
        LocalSubstrate::new(Arc::new(engine), 2)
    }

    async fn emit_thrown(substrate: &LocalSubstrate, from: u32, count: u32) {
        for i in from..from + count {
            let handle = substrate
                .invoke(
                    WorkItem::Emit(EmitWork {
                        subsets: vec![Delta::from_ids([i])],
                    }),
                    Some(TaskTag::Thrown),
                )
                .await
                .expect("invoke");
            substrate.wait(handle).await.expect("value");
        }
    }

    fn drain(finder: &mut TasksFinder) -> Vec<CompletedTask> {
        std::iter::from_fn(|| finder.acknowledge()).collect()
    }

    /// Listing only reaches the first page while `outage` is set.
    struct FirstPageOnly {
        inner: LocalSubstrate,
        outage: AtomicBool,
    }

    #[async_trait]
    impl Substrate for FirstPageOnly {
        fn name(&self) -> &'static str {
            "first-page-only"
        }

        fn session_id(&self) -> Uuid {
            self.inner.session_id()
        }

        async fn invoke(&self, work: WorkItem, tag: Option<TaskTag>) -> DomainResult<TaskHandle> {
            self.inner.invoke(work, tag).await
        }

        async fn wait(&self, handle: TaskHandle) -> DomainResult<TaskValue> {
            self.inner.wait(handle).await
        }

        async fn state(&self, handle: TaskHandle) -> DomainResult<TaskState> {
            self.inner.state(handle).await
        }

        async fn list_completed(
            &self,
            tag: TaskTag,
            page: usize,
            page_size: usize,
        ) -> DomainResult<TaskPage> {
            if page > 0 && self.outage.load(Ordering::SeqCst) {
                return Err(DomainError::Substrate("listing unavailable".to_string()));
            }
            self.inner.list_completed(tag, page, page_size).await
        }
    }

    #[tokio::test]
    async fn test_walks_pages_and_queues_only_new_tasks() {
        let substrate = local();
        let fetcher = ResultFetcher::new(Arc::new(substrate.clone()), RetryPolicy::new(1, 1, 1));
        let mut finder = TasksFinder::new(TaskTag::Thrown, 2);

        emit_thrown(&substrate, 0, 5).await;
        assert_eq!(finder.refresh(&fetcher).await.expect("refresh"), 5);
        let first = drain(&mut finder);
        assert_eq!(first.len(), 5);
        assert!(first.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));

        assert_eq!(finder.refresh(&fetcher).await.expect("refresh"), 0);
        assert!(finder.next_pending().is_none());

        emit_thrown(&substrate, 5, 2).await;
        assert_eq!(finder.refresh(&fetcher).await.expect("refresh"), 2);
        assert_eq!(drain(&mut finder).len(), 2);
        assert_eq!(finder.seen(), 7);
    }

    #[tokio::test]
    async fn test_unacknowledged_tasks_stay_queued() {
        let substrate = local();
        let fetcher = ResultFetcher::new(Arc::new(substrate.clone()), RetryPolicy::new(1, 1, 1));
        let mut finder = TasksFinder::new(TaskTag::Thrown, 10);

        emit_thrown(&substrate, 0, 3).await;
        finder.refresh(&fetcher).await.expect("refresh");
        let first = finder.acknowledge().expect("first task");
        let second = finder.next_pending().expect("second task").clone();

        assert_eq!(finder.refresh(&fetcher).await.expect("refresh"), 0);
        assert_eq!(finder.pending(), 2);
        assert_eq!(finder.next_pending(), Some(&second));
        assert!(second.sequence > first.sequence);
        assert_eq!(finder.seen(), 3);
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_earlier_pages() {
        let inner = local();
        emit_thrown(&inner, 0, 5).await;
        let substrate = Arc::new(FirstPageOnly {
            inner,
            outage: AtomicBool::new(true),
        });
        let fetcher = ResultFetcher::new(substrate.clone(), RetryPolicy::new(1, 1, 1));
        let mut finder = TasksFinder::new(TaskTag::Thrown, 2);

        let err = finder.refresh(&fetcher).await.expect_err("second page is down");
        assert!(matches!(err, DomainError::Substrate(_)));
        assert_eq!(finder.pending(), 2);
        assert_eq!(finder.seen(), 2);

        substrate.outage.store(false, Ordering::SeqCst);
        assert_eq!(finder.refresh(&fetcher).await.expect("refresh"), 3);
        let all = drain(&mut finder);
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
    }

    #[tokio::test]
    async fn test_skip_existing() {
        let substrate = local();
        let fetcher = ResultFetcher::new(Arc::new(substrate.clone()), RetryPolicy::new(1, 1, 1));

        emit_thrown(&substrate, 0, 3).await;
        let mut finder = TasksFinder::new(TaskTag::Thrown, 1000);
        finder.skip_existing(&fetcher).await.expect("skip");
        assert_eq!(finder.refresh(&fetcher).await.expect("refresh"), 0);
        assert!(finder.next_pending().is_none());
    }
}
