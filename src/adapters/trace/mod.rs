//! Trace sink implementations.

pub mod recording;

pub use recording::RecordingTraceSink;
