//! In-process substrate running units of work as tokio tasks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock, Semaphore};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Step, TaskHandle, TaskTag, TaskValue, WorkEnvelope, WorkItem};
use crate::domain::ports::{
    CompletedTask, Substrate, TaskPage, TaskState, WorkExecutor,
};

#[derive(Debug, Clone)]
enum SlotState {
    Pending,
    Done(Arc<Vec<u8>>),
    Failed(DomainError),
}

struct Slot {
    tag: Option<TaskTag>,
    state: watch::Sender<SlotState>,
}

struct Inner {
    session_id: Uuid,
    executor: Arc<dyn WorkExecutor>,
    slots: RwLock<HashMap<TaskHandle, Slot>>,
    completed: RwLock<Vec<CompletedTask>>,
    sequence: AtomicU64,
    workers: Semaphore,
}

/// Substrate that keeps every result in memory and runs work on the current
/// tokio runtime.
///
/// Units of work are stored in their serialised envelope and decoded right
/// before they run, so every unit crosses the same boundary it would cross on
/// a remote substrate. Values are stored serialised as well.
#[derive(Clone)]
pub struct LocalSubstrate {
    inner: Arc<Inner>,
}

impl LocalSubstrate {
    /// A fresh session running at most `max_workers` units at once.
    pub fn new(executor: Arc<dyn WorkExecutor>, max_workers: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                session_id: Uuid::new_v4(),
                executor,
                slots: RwLock::new(HashMap::new()),
                completed: RwLock::new(Vec::new()),
                sequence: AtomicU64::new(0),
                workers: Semaphore::new(max_workers.max(1)),
            }),
        }
    }

    /// Number of units submitted in this session.
    pub async fn submitted(&self) -> usize {
        self.inner.slots.read().await.len()
    }

    /// Run a unit and every continuation it delegates to, then publish the
    /// final value under `handle`.
    async fn drive(self, handle: TaskHandle, mut payload: Vec<u8>) {
        let outcome = loop {
            match self.run_once(&payload).await {
                Ok(Step::Done(value)) => break serde_json::to_vec(&value).map_err(DomainError::from),
                Ok(Step::Delegate(next)) => {
                    trace!(%handle, role = %next.role(), "delegating");
                    match WorkEnvelope::encode(&next) {
                        Ok(bytes) => payload = bytes,
                        Err(err) => break Err(err),
                    }
                }
                Err(err) => break Err(err),
            }
        };
        self.complete(handle, outcome).await;
    }

    async fn run_once(&self, payload: &[u8]) -> DomainResult<Step> {
        let work = WorkEnvelope::decode(payload)?;
        for dependency in work.dependencies() {
            self.await_slot(dependency).await?;
        }

        let _permit = self
            .inner
            .workers
            .acquire()
            .await
            .map_err(|_| DomainError::Substrate("worker pool closed".to_string()))?;
        let substrate: Arc<dyn Substrate> = Arc::new(self.clone());
        self.inner.executor.execute(work, substrate).await
    }

    async fn await_slot(&self, handle: TaskHandle) -> DomainResult<Arc<Vec<u8>>> {
        let mut receiver = {
            let slots = self.inner.slots.read().await;
            slots
                .get(&handle)
                .ok_or_else(|| DomainError::UnknownHandle(handle.id()))?
                .state
                .subscribe()
        };

        let state = receiver
            .wait_for(|state| !matches!(state, SlotState::Pending))
            .await
            .map_err(|_| DomainError::Substrate(format!("result slot {handle} closed")))?
            .clone();

        match state {
            SlotState::Done(bytes) => Ok(bytes),
            SlotState::Failed(err) => Err(err),
            SlotState::Pending => Err(DomainError::Substrate(format!(
                "result slot {handle} still pending"
            ))),
        }
    }

    async fn complete(&self, handle: TaskHandle, outcome: DomainResult<Vec<u8>>) {
        let succeeded = outcome.is_ok();
        let state = match outcome {
            Ok(bytes) => SlotState::Done(Arc::new(bytes)),
            Err(err) => {
                debug!(%handle, error = %err, "unit of work failed");
                SlotState::Failed(err)
            }
        };

        let tag = {
            let slots = self.inner.slots.read().await;
            slots.get(&handle).and_then(|slot| slot.tag)
        };

        // Logged before the value is visible: a reader that saw the value
        // also finds the entry.
        if let (true, Some(tag)) = (succeeded, tag) {
            let mut completed = self.inner.completed.write().await;
            let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
            completed.push(CompletedTask {
                handle,
                tag,
                sequence,
                completed_at: Utc::now(),
            });
        }

        if let Some(slot) = self.inner.slots.read().await.get(&handle) {
            slot.state.send_replace(state);
        }
    }
}

#[async_trait]
impl Substrate for LocalSubstrate {
    fn name(&self) -> &'static str {
        "local"
    }

    fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    async fn invoke(&self, work: WorkItem, tag: Option<TaskTag>) -> DomainResult<TaskHandle> {
        let payload = WorkEnvelope::encode(&work)?;
        let handle = TaskHandle::new();
        let (state, _) = watch::channel(SlotState::Pending);
        self.inner
            .slots
            .write()
            .await
            .insert(handle, Slot { tag, state });

        trace!(%handle, role = %work.role(), tag = ?tag, "invoked");
        tokio::spawn(self.clone().drive(handle, payload));
        Ok(handle)
    }

    async fn wait(&self, handle: TaskHandle) -> DomainResult<TaskValue> {
        let bytes = self.await_slot(handle).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn state(&self, handle: TaskHandle) -> DomainResult<TaskState> {
        let slots = self.inner.slots.read().await;
        let slot = slots
            .get(&handle)
            .ok_or_else(|| DomainError::UnknownHandle(handle.id()))?;
        let state = match &*slot.state.borrow() {
            SlotState::Pending => TaskState::Pending,
            SlotState::Done(_) => TaskState::Completed,
            SlotState::Failed(err) => TaskState::Failed(err.clone()),
        };
        Ok(state)
    }

    async fn list_completed(
        &self,
        tag: TaskTag,
        page: usize,
        page_size: usize,
    ) -> DomainResult<TaskPage> {
        if page_size == 0 {
            return Err(DomainError::Precondition(
                "page size must be at least 1".to_string(),
            ));
        }

        let completed = self.inner.completed.read().await;
        let matching: Vec<&CompletedTask> =
            completed.iter().filter(|task| task.tag == tag).collect();
        let tasks = matching
            .iter()
            .skip(page * page_size)
            .take(page_size)
            .map(|task| (*task).clone())
            .collect();

        Ok(TaskPage {
            total: matching.len(),
            tasks,
        })
    }
}
