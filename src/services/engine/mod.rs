//! Decomposition engine: the roles that search for minimal failing subsets.
//!
//! Every role is the body of one unit of work. A role either produces a
//! [`NodeResult`] or delegates its handle to a continuation that consumes the
//! results of the children it submitted. The engine never waits on a result
//! that is not already complete: the substrate releases a unit only once
//! its dependencies are done.

mod aggregator;
mod analyser;
mod corrector;
mod resolver;
mod round;
mod tester;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AggregateWork, Delta, EmitWork, Granularity, NodeResult, Outcome, Partition, Role,
    SearchConfig, Step, TaskHandle, TaskTag, TaskValue, TestWork, WorkItem,
};
use crate::domain::ports::{
    NullTraceSink, Oracle, Substrate, TraceEvent, TraceSink, WorkExecutor,
};
use crate::services::retry::RetryPolicy;

/// Executes every kind of unit of work against one oracle.
pub struct DecompositionEngine {
    oracle: Arc<dyn Oracle>,
    search: SearchConfig,
    retry: RetryPolicy,
    trace: Arc<dyn TraceSink>,
}

impl DecompositionEngine {
    /// Create an engine with the default retry policy and no tracing.
    ///
    /// # Arguments
    /// * `oracle` - Oracle every Tester calls
    /// * `search` - Search mode and guess-mismatch handling
    pub fn new(oracle: Arc<dyn Oracle>, search: SearchConfig) -> Self {
        Self {
            oracle,
            search,
            retry: RetryPolicy::default(),
            trace: Arc::new(NullTraceSink::new()),
        }
    }

    /// Retry policy for reading child results.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sink that observes role starts, decisions and oracle calls.
    #[must_use]
    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    /// Search settings every role reads.
    pub const fn search(&self) -> &SearchConfig {
        &self.search
    }
}

#[async_trait]
impl WorkExecutor for DecompositionEngine {
    async fn execute(&self, work: WorkItem, substrate: Arc<dyn Substrate>) -> DomainResult<Step> {
        let ctx = NodeContext {
            engine: self,
            substrate,
        };

        match work {
            WorkItem::Test(work) => tester::test(&ctx, work).await,
            WorkItem::Aggregate(work) => aggregator::aggregate(&ctx, work).await,
            WorkItem::AggregateComplements(work) => {
                aggregator::aggregate_complements(&ctx, work).await
            }
            WorkItem::Analyse(work) => analyser::analyse(&ctx, work).await,
            WorkItem::Resolve(work) => resolver::resolve(&ctx, work).await,
            WorkItem::Correct(work) => corrector::correct(&ctx, work).await,
            WorkItem::Round(work) => round::advance(&ctx, work).await,
            WorkItem::Emit(work) => Ok(Step::Done(TaskValue::Subsets(work.subsets))),
        }
    }
}

/// What a role sees while it runs: the engine settings and the substrate it
/// was scheduled on.
struct NodeContext<'a> {
    engine: &'a DecompositionEngine,
    substrate: Arc<dyn Substrate>,
}

impl NodeContext<'_> {
    const fn search(&self) -> &SearchConfig {
        &self.engine.search
    }

    fn started(&self, role: Role, universe: usize, parts: usize) {
        self.engine.trace.record(TraceEvent::NodeStarted {
            role,
            universe,
            parts,
        });
    }

    fn decision(&self, role: Role, label: &'static str) {
        debug!(role = %role, decision = label, "decomposition step");
        self.engine.trace.record(TraceEvent::Decision { role, label });
    }

    async fn run_oracle(&self, delta: &Delta) -> DomainResult<Outcome> {
        let outcome = Outcome::from_pass(self.engine.oracle.test(delta).await?);
        self.engine.trace.record(TraceEvent::OracleCalled {
            subset: delta.len(),
            outcome,
        });
        Ok(outcome)
    }

    async fn fetch(&self, handle: TaskHandle) -> DomainResult<TaskValue> {
        self.engine
            .retry
            .execute(|| {
                let substrate = Arc::clone(&self.substrate);
                async move { substrate.wait(handle).await }
            })
            .await
    }

    async fn fetch_nodes(&self, handles: &[TaskHandle]) -> DomainResult<Vec<NodeResult>> {
        try_join_all(handles.iter().map(|&handle| async move {
            self.fetch(handle).await?.into_node()
        }))
        .await
    }

    async fn spawn(&self, work: WorkItem) -> DomainResult<TaskHandle> {
        self.substrate.invoke(work, None).await
    }

    async fn spawn_all(&self, works: Vec<WorkItem>) -> DomainResult<Vec<TaskHandle>> {
        self.substrate.map_invoke(works).await
    }

    /// Test every part on its own, then aggregate over `partition`.
    ///
    /// Parts with an entry in `known` skip the oracle.
    async fn fan_out(
        &self,
        partition: Partition,
        hints: Vec<Option<Outcome>>,
        known: Vec<Option<Outcome>>,
    ) -> DomainResult<Step> {
        let tests = partition
            .parts()
            .iter()
            .enumerate()
            .map(|(index, part)| {
                let mut test = TestWork::recurse(part.clone(), Granularity::Split(2));
                test.known = known.get(index).copied().flatten();
                WorkItem::Test(test)
            })
            .collect();
        let inputs = self.spawn_all(tests).await?;
        Ok(Step::Delegate(WorkItem::Aggregate(AggregateWork {
            partition,
            inputs,
            hints,
        })))
    }

    /// Publish subsets that are known to be minimal and return them.
    async fn close_found(
        &self,
        role: Role,
        label: &'static str,
        found: Vec<Delta>,
    ) -> DomainResult<Step> {
        self.decision(role, label);
        self.substrate
            .invoke(
                WorkItem::Emit(EmitWork {
                    subsets: found.clone(),
                }),
                Some(TaskTag::Thrown),
            )
            .await?;
        Ok(done(NodeResult::Failed(found)))
    }

    /// No part or complement failed: either the universe is already atomic
    /// and minimal, or the granularity doubles.
    async fn escalate(&self, role: Role, partition: &Partition) -> DomainResult<Step> {
        let universe = partition.universe();
        if universe.len() <= partition.len() {
            return self
                .close_found(role, "granularity max", vec![universe])
                .await;
        }
        self.decision(role, "granularity up");
        self.fan_out(partition.refine(), Vec::new(), Vec::new()).await
    }
}

const fn done(result: NodeResult) -> Step {
    Step::Done(TaskValue::Node(result))
}
