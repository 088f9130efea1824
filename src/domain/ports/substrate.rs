//! Substrate port - the task-execution service units of work run on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Step, TaskHandle, TaskTag, TaskValue, WorkItem};

/// Execution state of a submitted unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting on dependencies or running.
    Pending,
    Completed,
    /// The unit, or a continuation it delegated to, returned an error.
    Failed(DomainError),
}

impl TaskState {
    /// Whether the unit has settled, successfully or not.
    pub const fn is_ready(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Metadata of a completed, tagged unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub handle: TaskHandle,
    pub tag: TaskTag,
    /// Position in the completion log of the session.
    pub sequence: u64,
    pub completed_at: DateTime<Utc>,
}

/// One page of a completed-task query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPage {
    /// Matching tasks across every page.
    pub total: usize,
    pub tasks: Vec<CompletedTask>,
}

/// Trait for task substrate implementations.
///
/// A substrate stores the serialised unit of work, runs it once every
/// dependency is complete and keeps its value under the returned handle. A
/// unit that delegates hands its handle over to the continuation: the handle
/// completes with the value of the last unit in the delegation chain.
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Get the substrate type name.
    fn name(&self) -> &'static str;

    /// Identifier of the session this substrate instance serves.
    fn session_id(&self) -> Uuid;

    /// Submit a unit of work, optionally tagged for discovery.
    async fn invoke(&self, work: WorkItem, tag: Option<TaskTag>) -> DomainResult<TaskHandle>;

    /// Submit a batch of untagged units of work.
    async fn map_invoke(&self, works: Vec<WorkItem>) -> DomainResult<Vec<TaskHandle>> {
        let mut handles = Vec::with_capacity(works.len());
        for work in works {
            handles.push(self.invoke(work, None).await?);
        }
        Ok(handles)
    }

    /// Block until the unit completes and return its value.
    async fn wait(&self, handle: TaskHandle) -> DomainResult<TaskValue>;

    /// Non-blocking readiness check.
    async fn is_ready(&self, handle: TaskHandle) -> DomainResult<bool> {
        Ok(self.state(handle).await?.is_ready())
    }

    /// Current execution state.
    async fn state(&self, handle: TaskHandle) -> DomainResult<TaskState>;

    /// Completed units carrying `tag`, in completion order, one page at a time.
    async fn list_completed(
        &self,
        tag: TaskTag,
        page: usize,
        page_size: usize,
    ) -> DomainResult<TaskPage>;
}

/// Runs the body of a unit of work.
///
/// The executor receives the substrate so that it can read its inputs and
/// submit children without owning the substrate.
#[async_trait]
pub trait WorkExecutor: Send + Sync {
    async fn execute(&self, work: WorkItem, substrate: Arc<dyn Substrate>) -> DomainResult<Step>;
}

/// Factory for substrate sessions.
pub trait SubstrateFactory: Send + Sync {
    /// Open a new session that runs units of work with `executor`.
    fn create(&self, executor: Arc<dyn WorkExecutor>) -> Arc<dyn Substrate>;
}
