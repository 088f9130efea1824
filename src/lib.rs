//! lockcell - distributed multi-cause delta debugging
//!
//! lockcell searches a universe of atoms for every minimal subset that makes
//! a black-box oracle fail. The search is split into small units of work that
//! run on a task substrate and hand results to each other by handle, so the
//! tree of tests can spread over as many workers as the substrate offers.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): deltas, partitions, conflict matrices, units
//!   of work and the oracle/substrate ports
//! - **Service Layer** (`services`): the decomposition engine, client jobs and
//!   the [`Lockcell`] facade
//! - **Adapters** (`adapters`): in-process substrate, oracles, trace sinks
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use lockcell::{Config, Lockcell, MockOracle};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let oracle = Arc::new(MockOracle::new(64).with_cause([2]).with_cause([0, 32]));
//!     let mut lockcell = Lockcell::new(Config::default(), oracle);
//!     lockcell.open();
//!     lockcell.run_rddmin().await?;
//!     println!("{:?}", lockcell.wait().await?);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::oracles::{CommandOracle, MockOracle};
pub use adapters::substrates::{LocalSubstrate, SubstrateRegistry};
pub use domain::models::{
    Atom, Config, Delta, JobKind, JobStatus, LoggingConfig, RetryConfig, SearchConfig,
    SearchMode, SubstrateConfig,
};
pub use domain::ports::{Oracle, Substrate, SubstrateFactory, WorkExecutor};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{DecompositionEngine, Lockcell};
