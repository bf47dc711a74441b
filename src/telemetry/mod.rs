//! Telemetry for the session engine.
//!
//! The engine and reconciler emit a [`SessionEvent`] on every state
//! transition (`spec.md` §6 and §4.8); `TelemetrySink` implementations can
//! log, aggregate, or forward those events. A sink can fail to deliver, but
//! `emit_best_effort` always absorbs that failure into a log line — emission
//! never fails a request.

pub mod events;
pub mod sinks;

pub use events::SessionEvent;
pub use sinks::{
    emit_best_effort, FallbackSink, LogSink, MemorySink, MulticastSink, NullSink, SinkError,
    StreamingSink, TelemetrySink,
};
