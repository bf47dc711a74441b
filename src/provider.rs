//! The seam between the session engine and whatever actually scales a
//! workload up and down.
//!
//! Grounded in `original_source/app/providers/{kubernetes,podman}.go`: both
//! backends there expose the same five operations, just against different
//! orchestrators. This trait is the Rust-native version of that interface
//! (`spec.md` §4.2).

use async_trait::async_trait;
use std::fmt;

use crate::instance::InstanceState;

/// A group is a provider-defined collection of instances that start and
/// stop together, e.g. a podman compose project or a set of Kubernetes
/// workloads sharing a label. Opaque to the engine beyond its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    pub name: String,
    pub instances: Vec<String>,
}

/// Error surface for provider calls.
///
/// Distinguishes transient failures (the call itself failed — network,
/// timeout, auth) from the provider reporting that the instance itself
/// cannot recover. The engine maps both onto [`InstanceState::errored`] or
/// [`InstanceState::unrecoverable`] respectively, but keeps the distinction
/// here so a [`crate::provider_guard::ProviderGuard`] can decide whether a
/// call is worth retrying.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider call failed: {0}")]
    CallFailed(String),
    #[error("instance {name} is unrecoverable: {message}")]
    Unrecoverable { name: String, message: String },
    #[error("instance {0} not found")]
    NotFound(String),
    #[error("malformed instance name {0:?}: {1}")]
    MalformedName(String, String),
}

impl ProviderError {
    pub fn call_failed(err: impl fmt::Display) -> Self {
        ProviderError::CallFailed(err.to_string())
    }
}

/// The backend that actually starts, stops, and inspects workloads.
///
/// Implementations are expected to be cheap to clone (an `Arc` around a
/// client handle) and safe to call concurrently — the engine may issue
/// `start`/`stop` for different names from different tasks at once, and
/// relies on [`crate::provider_guard::ProviderGuard`], not the provider
/// itself, for call-level resilience.
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Human-readable provider name, e.g. `"kubernetes"` or `"podman"`.
    fn name(&self) -> &str;

    /// Scale the named instance up to its configured replica count.
    /// Idempotent: calling `start` on an already-started instance is not an
    /// error. Returning `not-ready` is the normal success case — the
    /// workload may need time to converge.
    async fn start(&self, name: &str) -> Result<InstanceState, ProviderError>;

    /// Scale the named instance down to zero. Idempotent.
    async fn stop(&self, name: &str) -> Result<InstanceState, ProviderError>;

    /// Current readiness of the named instance.
    async fn get_state(&self, name: &str) -> Result<InstanceState, ProviderError>;

    /// All instances belonging to the named group, as defined by the
    /// provider (e.g. podman's label-based grouping).
    async fn get_groups(&self, group: &str) -> Result<Vec<Group>, ProviderError>;

    /// Register interest in being told when `name` transitions to stopped
    /// outside of a call to [`Provider::stop`] (e.g. an out-of-band scale-down,
    /// or a crash). Default implementation is a no-op for providers that
    /// have no such signal; the reconciler falls back to polling
    /// `get_state` in that case.
    async fn notify_stopped(&self, _name: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Lets callers keep a handle to a provider (e.g. to inspect call counts in
/// tests) while also handing an owned value to a [`crate::provider_guard::ProviderGuard`].
#[async_trait]
impl<P> Provider for std::sync::Arc<P>
where
    P: Provider + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn start(&self, name: &str) -> Result<InstanceState, ProviderError> {
        (**self).start(name).await
    }

    async fn stop(&self, name: &str) -> Result<InstanceState, ProviderError> {
        (**self).stop(name).await
    }

    async fn get_state(&self, name: &str) -> Result<InstanceState, ProviderError> {
        (**self).get_state(name).await
    }

    async fn get_groups(&self, group: &str) -> Result<Vec<Group>, ProviderError> {
        (**self).get_groups(group).await
    }

    async fn notify_stopped(&self, name: &str) -> Result<(), ProviderError> {
        (**self).notify_stopped(name).await
    }
}
