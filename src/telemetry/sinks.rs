use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;

use super::events::SessionEvent;

/// A sink-local failure to deliver an event, e.g. a closed channel or a
/// downstream write error. Carries no payload beyond a message — the engine
/// and reconciler never branch on it, they only log it.
#[derive(Debug, Error, Clone)]
#[error("telemetry sink failed to emit: {0}")]
pub struct SinkError(pub String);

/// Consumes [`SessionEvent`]s. Implementations must not block the caller for
/// long — the engine and reconciler call `emit` inline on the hot path.
#[async_trait]
pub trait TelemetrySink: Send + Sync + std::fmt::Debug {
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError>;
}

/// Call `sink.emit(event)`, logging (not propagating) any delivery failure.
/// The engine and reconciler treat telemetry as best-effort: a sink outage
/// must never hold up a session transition.
pub async fn emit_best_effort(sink: &(dyn TelemetrySink), event: SessionEvent) {
    if let Err(err) = sink.emit(event).await {
        tracing::warn!(error = %err, "telemetry sink failed to emit event");
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl TelemetrySink for NullSink {
    async fn emit(&self, _event: SessionEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Logs every event at `info` via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError> {
        tracing::info!(event = %event, name = event.name(), "session_event");
        Ok(())
    }
}

/// Stores events in a bounded in-memory ring, oldest evicted first. Mainly
/// useful for tests that assert on emitted events.
#[derive(Debug, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn unbounded() -> Self {
        Self { events: Arc::new(Mutex::new(Vec::new())), capacity: usize::MAX, evicted: Arc::new(AtomicU64::new(0)) }
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().expect("MemorySink.events: mutex poisoned").clone()
    }

    pub fn clear(&self) {
        self.events.lock().expect("MemorySink.clear: mutex poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("MemorySink.len: mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().expect("MemorySink.is_empty: mutex poisoned").is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError> {
        let mut guard = self.events.lock().expect("MemorySink.emit: mutex poisoned");
        if guard.len() >= self.capacity {
            guard.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push(event);
        Ok(())
    }
}

/// Broadcasts events to any number of subscribers (e.g. a future
/// server-sent-events endpoint). Slow subscribers drop messages rather
/// than backpressuring the emitter.
#[derive(Debug, Clone)]
pub struct StreamingSink {
    sender: Arc<tokio::sync::broadcast::Sender<SessionEvent>>,
    dropped: Arc<AtomicU64>,
    last_drop_ns: Arc<AtomicU64>,
}

impl StreamingSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender: Arc::new(sender), dropped: Arc::new(AtomicU64::new(0)), last_drop_ns: Arc::new(AtomicU64::new(0)) }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn last_drop(&self) -> Option<SystemTime> {
        match self.last_drop_ns.load(Ordering::Relaxed) {
            0 => None,
            ns => UNIX_EPOCH.checked_add(Duration::from_nanos(ns)),
        }
    }
}

#[async_trait]
impl TelemetrySink for StreamingSink {
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError> {
        if self.sender.send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.last_drop_ns.store(
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64,
                Ordering::Relaxed,
            );
        }
        Ok(())
    }
}

/// Fans a single event out to two sinks concurrently.
#[derive(Debug, Clone)]
pub struct MulticastSink<A, B> {
    sink_a: A,
    sink_b: B,
}

impl<A, B> MulticastSink<A, B> {
    pub fn new(sink_a: A, sink_b: B) -> Self {
        Self { sink_a, sink_b }
    }
}

#[async_trait]
impl<A, B> TelemetrySink for MulticastSink<A, B>
where
    A: TelemetrySink,
    B: TelemetrySink,
{
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError> {
        let (a, b) = tokio::join!(self.sink_a.emit(event.clone()), self.sink_b.emit(event));
        a.and(b)
    }
}

/// Tries `primary` first; calls `fallback` only when `primary` returns
/// `Err`. A caller-supplied `primary` that can genuinely fail (a network
/// sink, a file sink) gets its outage absorbed by `fallback` instead of
/// silently dropping the event.
#[derive(Debug, Clone)]
pub struct FallbackSink<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> FallbackSink<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<A, B> TelemetrySink for FallbackSink<A, B>
where
    A: TelemetrySink,
    B: TelemetrySink,
{
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError> {
        match self.primary.emit(event.clone()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "primary telemetry sink failed, falling back");
                self.fallback.emit(event).await
            }
        }
    }
}
