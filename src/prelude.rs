//! Convenient re-exports for the common Sablier types.
pub use crate::{
    backoff::Backoff,
    bulkhead::BulkheadPolicy,
    circuit_breaker::{CircuitBreakerConfig, CircuitBreakerPolicy, CircuitState},
    config::EngineConfig,
    engine::{SessionEngine, Target},
    error::ResilienceError,
    instance::{InstanceState, Status},
    jitter::Jitter,
    persistence::{FileSnapshotStore, PersistError, PersistedEntry, SnapshotStore},
    provider::{Group, Provider, ProviderError},
    provider_guard::{GuardConfig, ProviderGuard},
    reconciler::{Reconciler, ReconcilerHandles},
    retry::{BuildError, RetryPolicy, RetryPolicyBuilder},
    session::{Session, SessionStatus},
    store::{SessionStore, WaitOutcome},
    strategy::{BlockingRequest, Strategy, StrategyRequest},
    telemetry::{
        emit_best_effort, FallbackSink, LogSink, MemorySink, MulticastSink, NullSink, SessionEvent,
        SinkError, StreamingSink, TelemetrySink,
    },
    timeout::{TimeoutError, TimeoutPolicy, MAX_TIMEOUT},
};

#[cfg(any(test, feature = "test-util"))]
pub use crate::testing::MockProvider;
