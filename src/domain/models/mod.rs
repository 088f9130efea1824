pub mod config;
pub mod delta;
pub mod job;
pub mod matrix;
pub mod outcome;
pub mod partition;
pub mod work;

pub use config::{
    Config, LoggingConfig, OracleConfig, RetryConfig, SearchConfig, SearchMode, SubstrateConfig,
};
pub use delta::{Atom, Delta, FailingSets};
pub use job::{JobKind, JobStatus};
pub use matrix::{ConflictMatrix, Degree};
pub use outcome::{NodeResult, Outcome};
pub use partition::{Link, Partition};
pub use work::{
    AggregateWork, CorrectWork, EmitWork, Granularity, Guess, PairProbe, ResolveWork, Role,
    RoundLink, RoundWork, Step, TaskHandle, TaskTag, TaskValue, TestMode, TestWork,
    WorkEnvelope, WorkItem,
};
