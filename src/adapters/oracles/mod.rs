//! Oracle adapter implementations.

pub mod command;
pub mod mock;

pub use command::CommandOracle;
pub use mock::MockOracle;
