use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{TaskHandle, TaskTag, TaskValue};
use crate::domain::ports::{Substrate, TaskPage, TaskState};
use crate::services::retry::RetryPolicy;

/// Client-side access to a substrate session, with every retrieval wrapped
/// in the retry policy.
#[derive(Clone)]
pub struct ResultFetcher {
    substrate: Arc<dyn Substrate>,
    retry: RetryPolicy,
}

impl ResultFetcher {
    /// Wrap `substrate` so that every read goes through `retry`.
    pub fn new(substrate: Arc<dyn Substrate>, retry: RetryPolicy) -> Self {
        Self { substrate, retry }
    }

    pub fn substrate(&self) -> &Arc<dyn Substrate> {
        &self.substrate
    }

    /// Block until the unit completes and return its value.
    pub async fn fetch(&self, handle: TaskHandle) -> DomainResult<TaskValue> {
        self.retry
            .execute(|| {
                let substrate = Arc::clone(&self.substrate);
                async move { substrate.wait(handle).await }
            })
            .await
    }

    /// Current state of a unit, retried on transient errors.
    pub async fn state(&self, handle: TaskHandle) -> DomainResult<TaskState> {
        self.retry
            .execute(|| {
                let substrate = Arc::clone(&self.substrate);
                async move { substrate.state(handle).await }
            })
            .await
    }

    pub async fn is_ready(&self, handle: TaskHandle) -> DomainResult<bool> {
        Ok(self.state(handle).await?.is_ready())
    }

    /// One page of the completion log of `tag`.
    ///
    /// # Errors
    /// Returns `RetrievalExhausted` once transient failures outlast the
    /// retry policy; other errors are returned on the first attempt.
    pub async fn list_completed(
        &self,
        tag: TaskTag,
        page: usize,
        page_size: usize,
    ) -> DomainResult<TaskPage> {
        self.retry
            .execute(|| {
                let substrate = Arc::clone(&self.substrate);
                async move { substrate.list_completed(tag, page, page_size).await }
            })
            .await
    }
}
