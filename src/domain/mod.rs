//! Domain layer for lockcell
//!
//! This module contains the search data model, errors and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
