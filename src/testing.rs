//! A scriptable [`Provider`] for tests and demos, gated behind the
//! `test-util` feature so it never ships in a production binary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::instance::InstanceState;
use crate::provider::{Group, Provider, ProviderError};

#[derive(Debug, Clone)]
enum Script {
    State(InstanceState),
    Fail(String),
}

/// An in-memory provider whose responses are scripted ahead of time.
///
/// Unscripted names default to `not-ready(0, 1)` on `start`/`get_state` and
/// `not-ready(0, 0)` on `stop` — the same "still converging" shape a real
/// provider would report for a workload it just asked to scale.
#[derive(Debug, Default)]
pub struct MockProvider {
    states: Mutex<HashMap<String, Script>>,
    groups: Mutex<HashMap<String, Vec<Group>>>,
    start_calls: Mutex<Vec<String>>,
    stop_calls: Mutex<Vec<String>>,
    get_state_calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// `start`/`get_state` for `name` will report `ready(replicas)`.
    pub fn script_ready(&self, name: &str, replicas: u32) {
        self.states.lock().unwrap().insert(name.to_string(), Script::State(InstanceState::ready(name, replicas)));
    }

    /// `start`/`get_state` for `name` will report `not-ready(current, desired)`.
    pub fn script_not_ready(&self, name: &str, current: u32, desired: u32) {
        self.states
            .lock()
            .unwrap()
            .insert(name.to_string(), Script::State(InstanceState::not_ready(name, current, desired)));
    }

    /// `start`/`get_state` for `name` will report `unrecoverable(message)`.
    pub fn script_unrecoverable(&self, name: &str, message: impl Into<String>) {
        self.states
            .lock()
            .unwrap()
            .insert(name.to_string(), Script::State(InstanceState::unrecoverable(name, message.into())));
    }

    /// Any call for `name` fails with `ProviderError::CallFailed(message)`.
    pub fn script_failure(&self, name: &str, message: impl Into<String>) {
        self.states.lock().unwrap().insert(name.to_string(), Script::Fail(message.into()));
    }

    /// `get_groups(group)` will resolve to the given instance names.
    pub fn script_group(&self, group: &str, instances: Vec<String>) {
        self.groups.lock().unwrap().insert(group.to_string(), vec![Group { name: group.to_string(), instances }]);
    }

    pub fn start_call_count(&self, name: &str) -> usize {
        self.start_calls.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn stop_call_count(&self, name: &str) -> usize {
        self.stop_calls.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn get_state_call_count(&self, name: &str) -> usize {
        self.get_state_calls.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    fn resolve(&self, name: &str) -> Result<InstanceState, ProviderError> {
        match self.states.lock().unwrap().get(name) {
            Some(Script::State(state)) => Ok(state.clone()),
            Some(Script::Fail(message)) => Err(ProviderError::CallFailed(message.clone())),
            None => Ok(InstanceState::not_ready(name, 0, 1)),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self, name: &str) -> Result<InstanceState, ProviderError> {
        self.start_calls.lock().unwrap().push(name.to_string());
        self.resolve(name)
    }

    async fn stop(&self, name: &str) -> Result<InstanceState, ProviderError> {
        self.stop_calls.lock().unwrap().push(name.to_string());
        match self.states.lock().unwrap().get(name) {
            Some(Script::Fail(message)) => Err(ProviderError::CallFailed(message.clone())),
            _ => Ok(InstanceState::not_ready(name, 0, 0)),
        }
    }

    async fn get_state(&self, name: &str) -> Result<InstanceState, ProviderError> {
        self.get_state_calls.lock().unwrap().push(name.to_string());
        self.resolve(name)
    }

    async fn get_groups(&self, group: &str) -> Result<Vec<Group>, ProviderError> {
        Ok(self.groups.lock().unwrap().get(group).cloned().unwrap_or_default())
    }
}
