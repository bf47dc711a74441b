#![forbid(unsafe_code)]

//! # Sablier
//!
//! An on-demand workload activator: scale instances up when the first
//! request arrives, keep them alive while traffic continues, and scale them
//! back down after an idle period. Built around a concurrent session table
//! that multiplexes many simultaneous callers into at-most-one start call
//! per instance, tracks sliding expirations, and reconciles against
//! whatever actually runs the workload.
//!
//! ## Layout
//!
//! - [`instance`] — the `InstanceState` value type.
//! - [`provider`] — the `Provider` trait a concrete backend implements.
//! - [`provider_guard`] — resilience (bulkhead/circuit breaker/timeout/retry)
//!   wrapped around a `Provider`.
//! - [`store`] — the concurrent session table with single-flight starts.
//! - [`session`] — the aggregate view returned to callers.
//! - [`engine`] — `RequestDynamic`/`RequestBlocking`, the orchestrator.
//! - [`reconciler`] — the background refresh/expire sweep.
//! - [`strategy`] — the thin façade the HTTP layer calls.
//! - [`config`] — engine-level tunables.
//! - [`persistence`] — best-effort snapshot/restore of the session table.
//! - [`telemetry`] — session event emission.
//!
//! ## Quick start
//!
//! Requires the `test-util` feature, for [`testing::MockProvider`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sablier::engine::{SessionEngine, Target};
//! use sablier::provider_guard::{GuardConfig, ProviderGuard};
//! use sablier::store::SessionStore;
//! use sablier::telemetry::NullSink;
//! use sablier::testing::MockProvider;
//! use sablier::time::SystemClock;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new();
//! provider.script_ready("web", 1);
//!
//! let guard = Arc::new(ProviderGuard::new(provider, GuardConfig::default()));
//! let store = Arc::new(SessionStore::new(Arc::new(SystemClock)));
//! let engine = SessionEngine::new(store, guard, Arc::new(NullSink));
//!
//! let session = engine
//!     .request_dynamic(Target::Names(vec!["web".into()]), Duration::from_secs(300))
//!     .await;
//! assert!(session.is_ready());
//! # }
//! ```

mod adaptive;
mod backoff;
mod bulkhead;
mod circuit_breaker;
pub mod config;
pub mod engine;
mod error;
pub mod instance;
mod jitter;
pub mod persistence;
pub mod provider;
pub mod provider_guard;
pub mod reconciler;
mod retry;
pub mod session;
mod sleeper;
mod stack;
pub mod store;
pub mod strategy;
pub mod telemetry;
pub mod time;
mod timeout;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use engine::{SessionEngine, Target};
pub use instance::{InstanceState, Status};
pub use provider::{Group, Provider, ProviderError};
pub use provider_guard::{GuardConfig, ProviderGuard};
pub use session::{Session, SessionStatus};
pub use store::SessionStore;

pub mod prelude;
