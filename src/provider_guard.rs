//! Wraps a [`Provider`] with retry + circuit breaker + bulkhead + timeout,
//! built on [`ResilienceStack`]'s layering (retry outermost, then circuit
//! breaker, then bulkhead, then timeout wrapping the call). `start` runs
//! through a stack with retry capped at a single attempt — the engine's
//! single-flight `in_flight_start` is already the retry/coalescing boundary
//! for starts, and stacking a second one here would double up with that
//! invariant.

use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::instance::InstanceState;
use crate::provider::{Group, Provider, ProviderError};
use crate::retry::RetryPolicy;
use crate::stack::ResilienceStack;

/// Tunables for [`ProviderGuard`]. Defaults match `spec.md` §6.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub max_concurrent_calls: usize,
    pub call_timeout: Duration,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 64,
            call_timeout: Duration::from_secs(10),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 5,
                recovery_timeout: Duration::from_secs(30),
                half_open_max_calls: 1,
            },
        }
    }
}

/// Resilience wrapper around a [`Provider`]. One guard instance is shared by
/// every call the engine and reconciler make — the circuit breaker it
/// contains is workspace-wide, not per instance name, so a provider that is
/// genuinely down trips the breaker for every name at once rather than
/// letting each name fail independently into the same outage.
#[derive(Debug, Clone)]
pub struct ProviderGuard<P> {
    inner: Arc<P>,
    with_retry: Arc<ResilienceStack<ProviderError>>,
    no_retry: Arc<ResilienceStack<ProviderError>>,
}

impl<P> ProviderGuard<P>
where
    P: Provider + 'static,
{
    pub fn new(inner: P, config: GuardConfig) -> Self {
        let label: Arc<str> = Arc::from(inner.name());

        // Only a transient `CallFailed` is worth another attempt — an
        // `Unrecoverable`/`NotFound`/`MalformedName` report from the
        // provider is authoritative and retrying it would just repeat it.
        let retrying = RetryPolicy::builder()
            .max_attempts(3)
            .expect("3 is a valid attempt count")
            .should_retry(|err: &ProviderError| matches!(err, ProviderError::CallFailed(_)))
            .build();
        let with_retry = ResilienceStack::new()
            .bulkhead(config.max_concurrent_calls)
            .circuit_breaker_with_config(config.circuit_breaker.clone())
            .circuit_breaker_label(label.clone())
            .timeout(config.call_timeout)
            .retry(retrying)
            .build();

        // Single attempt, i.e. no retry: `start` relies on the engine's own
        // single-flight coalescing instead.
        let non_retrying = RetryPolicy::builder()
            .max_attempts(1)
            .expect("1 is a valid attempt count")
            .build();
        let no_retry = ResilienceStack::new()
            .bulkhead(config.max_concurrent_calls)
            .circuit_breaker_with_config(config.circuit_breaker)
            .circuit_breaker_label(label)
            .timeout(config.call_timeout)
            .retry(non_retrying)
            .build();

        Self { inner: Arc::new(inner), with_retry: Arc::new(with_retry), no_retry: Arc::new(no_retry) }
    }

    fn to_provider_error(err: crate::error::ResilienceError<ProviderError>) -> ProviderError {
        use crate::error::ResilienceError;
        match err {
            ResilienceError::Inner(e) => e,
            ResilienceError::Timeout { elapsed, timeout } => ProviderError::CallFailed(format!(
                "provider call timed out after {elapsed:?} (limit {timeout:?})"
            )),
            ResilienceError::Bulkhead { in_flight, max } => ProviderError::CallFailed(format!(
                "provider call rejected: {in_flight} in-flight calls already at limit {max}"
            )),
            ResilienceError::CircuitOpen { failure_count, open_duration } => {
                ProviderError::CallFailed(format!(
                    "provider circuit open ({failure_count} failures, open {open_duration:?})"
                ))
            }
            ResilienceError::RetryExhausted { attempts, failures } => {
                let last = failures.last().map(ToString::to_string).unwrap_or_default();
                ProviderError::CallFailed(format!(
                    "provider call failed after {attempts} attempts: {last}"
                ))
            }
        }
    }

    /// Start the named instance. Not retried by the guard — see the module
    /// docs for why.
    pub async fn start(&self, name: &str) -> Result<InstanceState, ProviderError> {
        let provider = self.inner.clone();
        let name = name.to_string();
        self.no_retry
            .execute(|| {
                let provider = provider.clone();
                let name = name.clone();
                async move { provider.start(&name).await.map_err(crate::error::ResilienceError::Inner) }
            })
            .await
            .map_err(Self::to_provider_error)
    }

    pub async fn stop(&self, name: &str) -> Result<InstanceState, ProviderError> {
        let provider = self.inner.clone();
        let name = name.to_string();
        self.with_retry
            .execute(|| {
                let provider = provider.clone();
                let name = name.clone();
                async move { provider.stop(&name).await.map_err(crate::error::ResilienceError::Inner) }
            })
            .await
            .map_err(Self::to_provider_error)
    }

    pub async fn get_state(&self, name: &str) -> Result<InstanceState, ProviderError> {
        let provider = self.inner.clone();
        let name = name.to_string();
        self.with_retry
            .execute(|| {
                let provider = provider.clone();
                let name = name.clone();
                async move {
                    provider.get_state(&name).await.map_err(crate::error::ResilienceError::Inner)
                }
            })
            .await
            .map_err(Self::to_provider_error)
    }

    pub async fn get_groups(&self, group: &str) -> Result<Vec<Group>, ProviderError> {
        let provider = self.inner.clone();
        let group = group.to_string();
        self.with_retry
            .execute(|| {
                let provider = provider.clone();
                let group = group.clone();
                async move {
                    provider.get_groups(&group).await.map_err(crate::error::ResilienceError::Inner)
                }
            })
            .await
            .map_err(Self::to_provider_error)
    }

    /// Not routed through the guard: a long-lived subscription, not a
    /// request/response call. See the module docs.
    pub async fn notify_stopped(&self, name: &str) -> Result<(), ProviderError> {
        self.inner.notify_stopped(name).await
    }
}
