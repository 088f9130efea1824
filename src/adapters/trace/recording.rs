//! Trace sink that keeps every event in memory.

use std::sync::Mutex;

use crate::domain::models::Role;
use crate::domain::ports::{TraceEvent, TraceSink};

/// Records trace events for inspection after a search.
#[derive(Debug, Default)]
pub struct RecordingTraceSink {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event so far, in record order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of oracle runs observed.
    pub fn oracle_calls(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, TraceEvent::OracleCalled { .. }))
            .count()
    }

    /// Number of units of work that started in `role`.
    pub fn nodes(&self, role: Role) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, TraceEvent::NodeStarted { role: r, .. } if *r == role))
            .count()
    }

    /// Every decision taken, in order.
    pub fn decisions(&self) -> Vec<(Role, &'static str)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TraceEvent::Decision { role, label } => Some((role, label)),
                _ => None,
            })
            .collect()
    }
}

impl TraceSink for RecordingTraceSink {
    fn record(&self, event: TraceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
