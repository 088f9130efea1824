//! Adapters for the oracle, substrate and trace ports.

pub mod oracles;
pub mod substrates;
pub mod trace;
