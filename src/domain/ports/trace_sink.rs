//! Trace sink port - optional diagnostics of the decomposition tree.

use crate::domain::models::{Outcome, Role};

/// Something that happened inside one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A unit started working on a universe split into `parts`.
    NodeStarted {
        role: Role,
        universe: usize,
        parts: usize,
    },
    /// The oracle was run on a subset.
    OracleCalled { subset: usize, outcome: Outcome },
    /// A unit took a branch of its decision logic.
    Decision { role: Role, label: &'static str },
}

/// Receives trace events. Implementations must be cheap; they run inline.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: TraceEvent);
}
