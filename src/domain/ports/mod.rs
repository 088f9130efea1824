//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces adapters implement:
//! - Oracle: the black-box test being minimised against
//! - Substrate: task submission, result retrieval and tag queries
//! - WorkExecutor: the body of a unit of work, run by a substrate
//! - TraceSink: optional diagnostics of the decomposition

pub mod null_trace;
pub mod oracle;
pub mod substrate;
pub mod trace_sink;

pub use null_trace::NullTraceSink;
pub use oracle::Oracle;
pub use substrate::{
    CompletedTask, Substrate, SubstrateFactory, TaskPage, TaskState, WorkExecutor,
};
pub use trace_sink::{TraceEvent, TraceSink};
