//! Bulkhead limiting how many provider calls [`crate::provider_guard::ProviderGuard`]
//! lets run at once. Rejections surface as `ResilienceError::Bulkhead` and
//! become a `ProviderError::CallFailed` at the guard boundary — the bulkhead
//! itself is provider-agnostic, the translation is what's domain-specific.

use crate::error::ResilienceError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct BulkheadPolicy {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl BulkheadPolicy {
    pub fn new(max_concurrent: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(max_concurrent)), max_concurrent }
    }

    pub fn unlimited() -> Self {
        // Semaphore::MAX_PERMITS is approximately usize::MAX / 4
        // Use a large but safe value: 1 billion concurrent operations
        Self::new(1_000_000_000)
    }

    pub async fn execute<T, E, Fut, Op>(&self, mut operation: Op) -> Result<T, ResilienceError<E>>
    where
        T: Send,
        E: std::error::Error + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResilienceError<E>>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        let available = self.semaphore.available_permits();
        let in_flight = self.max_concurrent.saturating_sub(available);

        let permit = self
            .semaphore
            .try_acquire()
            .map_err(|_| ResilienceError::Bulkhead { in_flight, max: self.max_concurrent })?;

        let result = operation().await;
        drop(permit);
        result
    }
}
