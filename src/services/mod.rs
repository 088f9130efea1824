//! Services: the decomposition engine, client job handling and retries.

pub mod engine;
pub mod jobs;
pub mod lockcell;
pub mod retry;

pub use engine::DecompositionEngine;
pub use jobs::{Job, ResultFetcher};
pub use lockcell::Lockcell;
pub use retry::RetryPolicy;
