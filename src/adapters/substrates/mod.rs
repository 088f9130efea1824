//! Substrate adapter implementations.

pub mod local;
pub mod registry;

pub use local::LocalSubstrate;
pub use registry::SubstrateRegistry;
