//! Provider registry: turns `--provider.name` into a concrete backend.
//!
//! Only two backends ship in this binary: `local`, a trivial in-process
//! backend that converges immediately (useful for trying the server without
//! any real orchestrator on hand), and `mock`, the scriptable test harness
//! exposed for integration testing against a known sequence of states. Real
//! backends (Kubernetes, Podman, Docker) are out of scope here — `spec.md`
//! §1 draws that boundary at the `Provider` trait itself.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use sablier::{Group, InstanceState, Provider, ProviderError};

#[derive(Debug, thiserror::Error)]
#[error("unknown provider {0:?}; expected one of: local, mock")]
pub struct UnknownProvider(pub String);

/// Converges any name to `ready(1)` as soon as `start` is called, and back
/// to `not-ready` on `stop`. No groups.
#[derive(Debug, Default)]
pub struct LocalProvider {
    started: Mutex<HashSet<String>>,
}

#[async_trait]
impl Provider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn start(&self, name: &str) -> Result<InstanceState, ProviderError> {
        self.started.lock().expect("LocalProvider.start: mutex poisoned").insert(name.to_string());
        Ok(InstanceState::ready(name, 1))
    }

    async fn stop(&self, name: &str) -> Result<InstanceState, ProviderError> {
        self.started.lock().expect("LocalProvider.stop: mutex poisoned").remove(name);
        Ok(InstanceState::not_ready(name, 0, 0))
    }

    async fn get_state(&self, name: &str) -> Result<InstanceState, ProviderError> {
        let is_started = self.started.lock().expect("LocalProvider.get_state: mutex poisoned").contains(name);
        Ok(if is_started { InstanceState::ready(name, 1) } else { InstanceState::not_ready(name, 0, 1) })
    }

    async fn get_groups(&self, _group: &str) -> Result<Vec<Group>, ProviderError> {
        Ok(vec![])
    }
}

/// Dispatches to whichever backend `--provider.name` selected. A plain enum
/// rather than `Box<dyn Provider>`: the engine is generic over `P: Provider`
/// and this keeps it monomorphized without requiring a blanket impl over
/// trait objects.
#[derive(Debug)]
pub enum AnyProvider {
    Local(LocalProvider),
    Mock(sablier::testing::MockProvider),
}

#[async_trait]
impl Provider for AnyProvider {
    fn name(&self) -> &str {
        match self {
            AnyProvider::Local(p) => p.name(),
            AnyProvider::Mock(p) => p.name(),
        }
    }

    async fn start(&self, name: &str) -> Result<InstanceState, ProviderError> {
        match self {
            AnyProvider::Local(p) => p.start(name).await,
            AnyProvider::Mock(p) => p.start(name).await,
        }
    }

    async fn stop(&self, name: &str) -> Result<InstanceState, ProviderError> {
        match self {
            AnyProvider::Local(p) => p.stop(name).await,
            AnyProvider::Mock(p) => p.stop(name).await,
        }
    }

    async fn get_state(&self, name: &str) -> Result<InstanceState, ProviderError> {
        match self {
            AnyProvider::Local(p) => p.get_state(name).await,
            AnyProvider::Mock(p) => p.get_state(name).await,
        }
    }

    async fn get_groups(&self, group: &str) -> Result<Vec<Group>, ProviderError> {
        match self {
            AnyProvider::Local(p) => p.get_groups(group).await,
            AnyProvider::Mock(p) => p.get_groups(group).await,
        }
    }
}

pub fn build(name: &str) -> Result<AnyProvider, UnknownProvider> {
    match name {
        "local" => Ok(AnyProvider::Local(LocalProvider::default())),
        "mock" => Ok(AnyProvider::Mock(sablier::testing::MockProvider::new())),
        other => Err(UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_provider_converges_on_start() {
        let provider = LocalProvider::default();
        let state = provider.start("web").await.unwrap();
        assert!(state.is_ready());
        let state = provider.get_state("web").await.unwrap();
        assert!(state.is_ready());
    }

    #[tokio::test]
    async fn local_provider_reverts_on_stop() {
        let provider = LocalProvider::default();
        provider.start("web").await.unwrap();
        provider.stop("web").await.unwrap();
        let state = provider.get_state("web").await.unwrap();
        assert!(!state.is_ready());
    }

    #[test]
    fn unknown_provider_name_is_rejected() {
        assert!(build("kubernetes").is_err());
        assert!(build("local").is_ok());
        assert!(build("mock").is_ok());
    }
}
