//! Units of work exchanged with the task substrate.
//!
//! Every unit is plain data: the deltas and partitions it works on plus the
//! handles of the results it consumes. The [`WorkItem`] enum is the registry
//! of unit kinds; [`WorkEnvelope`] is the versioned wire form the substrate
//! stores and ships.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::delta::Delta;
use super::matrix::ConflictMatrix;
use super::outcome::{NodeResult, Outcome};
use super::partition::Partition;
use crate::domain::errors::{DomainError, DomainResult};

/// Opaque reference to the eventual value of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(Uuid);

impl TaskHandle {
    /// A fresh random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn id(self) -> Uuid {
        self.0
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag attached to a submission so that clients can discover its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTag {
    /// Root of a single-round search; its completion ends the job.
    Root,
    /// Early publication of failing subsets.
    Thrown,
    /// Root of one iteration of the round chain.
    RoundIteration,
}

impl TaskTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Thrown => "thrown",
            Self::RoundIteration => "round_iteration",
        }
    }
}

/// Role a unit of work plays in the decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tester,
    Aggregator,
    ComplementAggregator,
    Analyser,
    Resolver,
    Corrector,
    Round,
    Emit,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tester => "tester",
            Self::Aggregator => "aggregator",
            Self::ComplementAggregator => "complement_aggregator",
            Self::Analyser => "analyser",
            Self::Resolver => "resolver",
            Self::Corrector => "corrector",
            Self::Round => "round",
            Self::Emit => "emit",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a tester subdivides a failing delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Contiguous split into this many parts.
    Split(usize),
    /// A subdivision computed upstream.
    Explicit(Partition),
}

impl Granularity {
    pub fn parts(&self) -> usize {
        match self {
            Self::Split(n) => *n,
            Self::Explicit(partition) => partition.len(),
        }
    }
}

/// Whether a failing tester recurses or only reports the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    /// Split a failing delta and search its parts.
    Recurse,
    /// Report `Probed` on failure without searching further.
    ProbeOnly,
}

/// Test one delta and, in recurse mode, search it on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestWork {
    pub delta: Delta,
    pub granularity: Granularity,
    pub mode: TestMode,
    /// Outcome already known upstream; skips the oracle.
    #[serde(default)]
    pub known: Option<Outcome>,
    /// Known complement outcomes for an explicit partition, by part index.
    #[serde(default)]
    pub complement_hints: Vec<Option<Outcome>>,
    /// Known outcomes of the parts of an explicit partition, by part index.
    #[serde(default)]
    pub part_hints: Vec<Option<Outcome>>,
}

impl TestWork {
    /// A recursing test that splits `delta` by `granularity` on failure.
    pub const fn recurse(delta: Delta, granularity: Granularity) -> Self {
        Self {
            delta,
            granularity,
            mode: TestMode::Recurse,
            known: None,
            complement_hints: Vec::new(),
            part_hints: Vec::new(),
        }
    }

    /// A test that only reports whether `delta` fails.
    pub const fn probe(delta: Delta) -> Self {
        Self {
            delta,
            granularity: Granularity::Split(2),
            mode: TestMode::ProbeOnly,
            known: None,
            complement_hints: Vec::new(),
            part_hints: Vec::new(),
        }
    }

    /// Skip the oracle and use `outcome`.
    #[must_use]
    pub fn with_known(mut self, outcome: Outcome) -> Self {
        self.known = Some(outcome);
        self
    }

    /// Known complement outcomes, by part index of an explicit partition.
    #[must_use]
    pub fn with_hints(mut self, hints: Vec<Option<Outcome>>) -> Self {
        self.complement_hints = hints;
        self
    }

    /// Known outcomes of the parts themselves, by part index.
    #[must_use]
    pub fn with_part_hints(mut self, hints: Vec<Option<Outcome>>) -> Self {
        self.part_hints = hints;
        self
    }
}

/// Fan-in over one result per part (or per complement) of a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateWork {
    pub partition: Partition,
    pub inputs: Vec<TaskHandle>,
    /// Known complement outcomes, by part index.
    #[serde(default)]
    pub hints: Vec<Option<Outcome>>,
}

/// A probe of the universe minus two failing parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairProbe {
    pub first: usize,
    pub second: usize,
    pub handle: TaskHandle,
}

/// Matrix construction and classification over the analysed partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveWork {
    pub partition: Partition,
    /// Complement outcome of every part.
    pub complements: Vec<Outcome>,
    /// For each failing index, its failing sibling or itself.
    pub conjugates: Vec<Option<usize>>,
    pub probes: Vec<PairProbe>,
}

/// Which guess the corrector verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guess {
    /// One cause outside every failing part.
    Single,
    /// Two causes, one per separated group.
    Pair,
}

/// Check of a resolver guess against the sub-searches it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectWork {
    pub guess: Guess,
    pub partition: Partition,
    /// Kept for the reconstruction fallback.
    pub matrix: ConflictMatrix,
    /// One sub-search per cause the guess predicts.
    pub verify: Vec<TaskHandle>,
}

/// One round of the chain: search `universe`, then link the next round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundWork {
    pub universe: Delta,
    /// Iteration of the previous round, whose findings leave the universe.
    pub previous: Option<TaskHandle>,
    pub index: usize,
}

/// Publication of subsets under the thrown tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitWork {
    pub subsets: Vec<Delta>,
}

/// Registry of every unit-of-work kind the engine executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    Test(TestWork),
    Aggregate(AggregateWork),
    AggregateComplements(AggregateWork),
    Analyse(AggregateWork),
    Resolve(ResolveWork),
    Correct(CorrectWork),
    Round(RoundWork),
    Emit(EmitWork),
}

impl WorkItem {
    /// Role that executes this unit.
    pub const fn role(&self) -> Role {
        match self {
            Self::Test(_) => Role::Tester,
            Self::Aggregate(_) => Role::Aggregator,
            Self::AggregateComplements(_) => Role::ComplementAggregator,
            Self::Analyse(_) => Role::Analyser,
            Self::Resolve(_) => Role::Resolver,
            Self::Correct(_) => Role::Corrector,
            Self::Round(_) => Role::Round,
            Self::Emit(_) => Role::Emit,
        }
    }

    /// Results that must be complete before this unit may run.
    pub fn dependencies(&self) -> Vec<TaskHandle> {
        match self {
            Self::Aggregate(work) | Self::AggregateComplements(work) | Self::Analyse(work) => {
                work.inputs.clone()
            }
            Self::Resolve(work) => work.probes.iter().map(|probe| probe.handle).collect(),
            Self::Correct(work) => work.verify.clone(),
            Self::Round(work) => work.previous.into_iter().collect(),
            Self::Test(_) | Self::Emit(_) => Vec::new(),
        }
    }
}

/// One link of the lazily extended round chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "link", rename_all = "snake_case")]
pub enum RoundLink {
    Step {
        index: usize,
        iteration: TaskHandle,
        next: TaskHandle,
    },
    End {
        index: usize,
    },
}

/// Value stored for a completed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "value", content = "data", rename_all = "snake_case")]
pub enum TaskValue {
    Node(NodeResult),
    Round(RoundLink),
    Subsets(Vec<Delta>),
}

impl TaskValue {
    /// # Errors
    /// Returns `StructuralInvariant` for any other kind of value.
    pub fn into_node(self) -> DomainResult<NodeResult> {
        match self {
            Self::Node(result) => Ok(result),
            other => Err(unexpected("node result", &other)),
        }
    }

    pub fn into_round(self) -> DomainResult<RoundLink> {
        match self {
            Self::Round(link) => Ok(link),
            other => Err(unexpected("round link", &other)),
        }
    }

    pub fn into_subsets(self) -> DomainResult<Vec<Delta>> {
        match self {
            Self::Subsets(subsets) => Ok(subsets),
            other => Err(unexpected("published subsets", &other)),
        }
    }
}

fn unexpected(expected: &str, found: &TaskValue) -> DomainError {
    let found = match found {
        TaskValue::Node(_) => "node result",
        TaskValue::Round(_) => "round link",
        TaskValue::Subsets(_) => "published subsets",
    };
    DomainError::StructuralInvariant(format!("expected {expected}, found {found}"))
}

/// Result of executing one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The unit produced its value.
    Done(TaskValue),
    /// The unit hands its handle over to a continuation.
    Delegate(WorkItem),
}

/// Versioned wire form of a unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkEnvelope {
    pub version: u32,
    pub item: WorkItem,
}

impl WorkEnvelope {
    pub const VERSION: u32 = 1;

    /// Serialise `item` at the current version.
    pub fn encode(item: &WorkItem) -> DomainResult<Vec<u8>> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            version: u32,
            item: &'a WorkItem,
        }

        Ok(serde_json::to_vec(&Borrowed {
            version: Self::VERSION,
            item,
        })?)
    }

    /// Read an envelope back.
    ///
    /// # Errors
    /// Returns `UnsupportedEnvelope` for another version and
    /// `SerializationError` for malformed bytes.
    pub fn decode(bytes: &[u8]) -> DomainResult<WorkItem> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        if envelope.version != Self::VERSION {
            return Err(DomainError::UnsupportedEnvelope {
                found: envelope.version,
                expected: Self::VERSION,
            });
        }
        Ok(envelope.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_carries_the_work_item() {
        let item = WorkItem::Test(
            TestWork::recurse(Delta::from_ids([1, 2, 3]), Granularity::Split(2))
                .with_known(Outcome::Fail),
        );
        let bytes = WorkEnvelope::encode(&item).expect("encode");
        let text = String::from_utf8(bytes.clone()).expect("utf8");
        assert!(text.contains("\"version\":1"));
        assert!(text.contains("\"kind\":\"test\""));
        assert_eq!(WorkEnvelope::decode(&bytes).expect("decode"), item);
    }

    #[test]
    fn test_envelope_rejects_unknown_version() {
        let bytes = br#"{"version":7,"item":{"kind":"emit","subsets":[]}}"#;
        assert_eq!(
            WorkEnvelope::decode(bytes),
            Err(DomainError::UnsupportedEnvelope {
                found: 7,
                expected: 1
            })
        );
    }

    #[test]
    fn test_dependencies() {
        let previous = TaskHandle::new();
        let round = WorkItem::Round(RoundWork {
            universe: Delta::range(4),
            previous: Some(previous),
            index: 1,
        });
        assert_eq!(round.dependencies(), vec![previous]);
        assert_eq!(round.role(), Role::Round);

        let emit = WorkItem::Emit(EmitWork { subsets: vec![] });
        assert!(emit.dependencies().is_empty());
    }

    #[test]
    fn test_task_value_accessors() {
        let value = TaskValue::Subsets(vec![Delta::from_ids([4])]);
        assert!(value.clone().into_node().is_err());
        assert_eq!(value.into_subsets().expect("subsets"), vec![Delta::from_ids([4])]);
    }
}
