//! The value object describing a named workload's readiness.
//!
//! Mirrors `spec.md` §3/§4.1: a pure value type with constructor
//! conveniences, no behavior of its own.

use std::fmt;

/// Readiness classification for an instance, as reported by a [`Provider`](crate::provider::Provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The workload has converged to its desired scale.
    Ready,
    /// The workload is scaling but has not yet converged.
    NotReady,
    /// The workload is in a state the provider cannot recover from
    /// without operator intervention.
    Unrecoverable,
    /// A provider call failed transiently (network, timeout, auth). Distinct
    /// from [`Status::Unrecoverable`]: the reconciler keeps polling an
    /// `Errored` entry every sweep and never releases blocking waiters for
    /// it, whereas `Unrecoverable` is a provider-reported terminal state.
    Errored,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "ready"),
            Status::NotReady => write!(f, "not-ready"),
            Status::Unrecoverable => write!(f, "unrecoverable"),
            Status::Errored => write!(f, "errored"),
        }
    }
}

/// A named workload's current readiness, as reported by a provider.
///
/// Invariants (enforced by the constructors below, never by a free-standing
/// validator — there is no way to build an `InstanceState` that violates
/// them):
/// - `Unrecoverable` always carries a non-empty `message`.
/// - `Ready` always has `current_replicas >= desired_replicas >= 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceState {
    pub name: String,
    pub current_replicas: u32,
    pub desired_replicas: u32,
    pub status: Status,
    pub message: String,
}

impl InstanceState {
    /// The instance has converged: `current_replicas` copies are serving out
    /// of `desired_replicas` desired. Panics if `replicas` is 0 — a ready
    /// instance with zero replicas is a contradiction in terms, and every
    /// provider in this codebase can avoid constructing one.
    pub fn ready(name: impl Into<String>, replicas: u32) -> Self {
        assert!(replicas >= 1, "a ready instance must have at least 1 replica");
        Self {
            name: name.into(),
            current_replicas: replicas,
            desired_replicas: replicas,
            status: Status::Ready,
            message: String::new(),
        }
    }

    /// The instance reported `current`/`desired` replicas that have not yet
    /// converged. `current` and `desired` are whatever the provider reports;
    /// the engine does not second-guess them.
    pub fn not_ready(name: impl Into<String>, current: u32, desired: u32) -> Self {
        Self {
            name: name.into(),
            current_replicas: current,
            desired_replicas: desired,
            status: Status::NotReady,
            message: String::new(),
        }
    }

    /// The instance cannot recover without operator intervention. `message`
    /// must be non-empty and should be a human-readable diagnostic, since it
    /// is surfaced verbatim to HTTP callers per `spec.md` §7.
    pub fn unrecoverable(name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty(), "unrecoverable state must carry a diagnostic message");
        Self {
            name: name.into(),
            current_replicas: 0,
            desired_replicas: 0,
            status: Status::Unrecoverable,
            message,
        }
    }

    /// A provider call (`start`/`get_state`) failed transiently. Per
    /// `spec.md` §4.5, the reconciler treats this as retryable: the entry is
    /// never removed and no blocking waiter is released, unlike a true
    /// [`Status::Unrecoverable`] report; see [`crate::reconciler::Reconciler`].
    pub fn errored(name: impl Into<String>, err: &(impl fmt::Display + ?Sized)) -> Self {
        Self { name: name.into(), current_replicas: 0, desired_replicas: 0, status: Status::Errored, message: err.to_string() }
    }

    pub fn is_ready(&self) -> bool {
        self.status == Status::Ready
    }

    pub fn is_unrecoverable(&self) -> bool {
        self.status == Status::Unrecoverable
    }

    /// True for a transient provider-call failure. See [`Status::Errored`].
    pub fn is_errored(&self) -> bool {
        self.status == Status::Errored
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}/{} replicas",
            self.name, self.status, self.current_replicas, self.desired_replicas
        )?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
