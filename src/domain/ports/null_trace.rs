//! Null trace sink implementation.
//!
//! Used when diagnostics are not needed but the engine requires a
//! `TraceSink`.

use super::trace_sink::{TraceEvent, TraceSink};

/// A no-op trace sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTraceSink;

impl NullTraceSink {
    pub const fn new() -> Self {
        Self
    }
}

impl TraceSink for NullTraceSink {
    fn record(&self, _event: TraceEvent) {}
}
