//! Engine-level configuration: the knobs the engine and reconciler read,
//! independent of how they were sourced (CLI, env, file — that merge lives
//! in `sablier-server`, see `spec.md` §6 and SPEC §4.9).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::adaptive::Adaptive;
use crate::circuit_breaker::CircuitBreakerConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 10000, base_path: "/".to_string() }
    }
}

/// Static configuration used to build the engine, reconciler, and guard.
/// `refresh_interval`/`expire_interval` are additionally exposed as
/// [`Adaptive`] handles (see [`EngineConfig::refresh_interval_handle`]) so
/// an operator can retune the reconciler's sweep cadence without a restart.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub session_duration_default: Duration,
    pub refresh_interval: Duration,
    pub expire_interval: Duration,
    pub provider_call_timeout: Duration,
    pub provider_circuit_breaker: CircuitBreakerConfig,
    pub provider_bulkhead: usize,
    pub provider_retry_attempts: usize,
    pub storage_file: Option<PathBuf>,
    pub storage_interval: Duration,
    pub server: ServerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_duration_default: Duration::from_secs(5 * 60),
            refresh_interval: Duration::from_secs(5),
            expire_interval: Duration::from_secs(1),
            provider_call_timeout: Duration::from_secs(10),
            provider_circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 5,
                recovery_timeout: Duration::from_secs(30),
                half_open_max_calls: 1,
            },
            provider_bulkhead: 64,
            provider_retry_attempts: 3,
            storage_file: None,
            storage_interval: Duration::from_secs(30),
            server: ServerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Build a fresh pair of hot-reloadable handles seeded from this
    /// config's `refresh_interval`/`expire_interval`. The reconciler holds
    /// these, not the raw `Duration`s, so a config reload can retune its
    /// loops in place.
    pub fn reconciler_intervals(&self) -> ReconcilerIntervals {
        ReconcilerIntervals {
            refresh: Arc::new(Adaptive::new(self.refresh_interval)),
            expire: Arc::new(Adaptive::new(self.expire_interval)),
        }
    }
}

/// Hot-reloadable handles for the reconciler's two sub-task cadences.
#[derive(Clone)]
pub struct ReconcilerIntervals {
    pub refresh: Arc<Adaptive<Duration>>,
    pub expire: Arc<Adaptive<Duration>>,
}
