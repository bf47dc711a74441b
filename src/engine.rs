//! The orchestrator: start-on-demand, single-flight coalescing, group
//! expansion, readiness aggregation (`spec.md` §4.4, component C4).

use std::sync::Arc;
use std::time::Duration;

use crate::instance::InstanceState;
use crate::provider::Provider;
use crate::provider_guard::ProviderGuard;
use crate::session::Session;
use crate::store::{SessionStore, WaitOutcome};
use crate::telemetry::{emit_best_effort, SessionEvent, TelemetrySink};

/// An engine request targets either an explicit name list or a
/// provider-defined group, resolved to names once per call (`spec.md` §3).
#[derive(Debug, Clone)]
pub enum Target {
    Names(Vec<String>),
    Group(String),
}

/// Everything the façade (C6) needs to drive one request.
///
/// `store` is shared (not owned outright) because the [`crate::reconciler::Reconciler`]
/// walks the same session map concurrently — both components are peers over
/// one `Arc<SessionStore>`, never each with their own copy.
pub struct SessionEngine<P> {
    store: Arc<SessionStore>,
    guard: Arc<ProviderGuard<P>>,
    sink: Arc<dyn TelemetrySink>,
}

impl<P> SessionEngine<P>
where
    P: Provider + 'static,
{
    pub fn new(store: Arc<SessionStore>, guard: Arc<ProviderGuard<P>>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self { store, guard, sink }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Resolve a [`Target`] to a concrete name list. A named group that
    /// resolves to no instances becomes a single synthetic `unrecoverable`
    /// contribution named after the group, per `spec.md` §4.4 step 1 — there
    /// is no name to key a real entry on, so the caller needs the failure
    /// surfaced directly rather than silently returning an empty session.
    async fn resolve(&self, target: &Target) -> Result<Vec<String>, InstanceState> {
        match target {
            Target::Names(names) => Ok(names.clone()),
            Target::Group(group) => match self.guard.get_groups(group).await {
                Ok(groups) => {
                    let names: Vec<String> =
                        groups.into_iter().flat_map(|g| g.instances).collect();
                    if names.is_empty() {
                        Err(InstanceState::unrecoverable(group.as_str(), format!("group {group:?} has no instances")))
                    } else {
                        Ok(names)
                    }
                }
                Err(err) => Err(InstanceState::errored(group.as_str(), &err)),
            },
        }
    }

    /// `spec.md` §4.4 step 2: create-or-refresh, single-flight start, return
    /// the contribution. Never calls the provider while holding the entry's
    /// lock — `try_begin_start`/`finish_start` bracket the call instead.
    ///
    /// The provider call itself runs on a detached task (see
    /// [`Self::spawn_start`]): the winning caller only awaits the task's
    /// `JoinHandle`, so dropping this future (a disconnected HTTP client, a
    /// `select!` that picked another branch) never aborts the start. That
    /// keeps `in_flight_start` from wedging — see testable property 7.
    async fn ensure_active(&self, name: &str, session_duration: Duration) -> InstanceState {
        let (entry, created) = self.store.get_or_create(name, session_duration);
        let now = self.store.now();

        if created {
            emit_best_effort(&*self.sink, SessionEvent::Requested { name: name.to_string() }).await;
        } else {
            entry.refresh(now, session_duration);
        }

        let snapshot = entry.snapshot();
        let needs_start = created || snapshot.is_unrecoverable() || snapshot.is_errored();
        if needs_start && entry.try_begin_start() {
            emit_best_effort(&*self.sink, SessionEvent::Started { name: name.to_string() }).await;
            let handle = self.spawn_start(name.to_string(), entry.clone());
            let _ = handle.await;
        }

        entry.snapshot()
    }

    /// Issue `Start` on its own task so its lifetime is independent of
    /// whichever caller's `ensure_active` happened to win `try_begin_start`.
    /// The task always runs to completion and always calls `finish_start`,
    /// no matter how many callers are waiting on it or drop out early.
    fn spawn_start(&self, name: String, entry: Arc<crate::store::SessionEntry>) -> tokio::task::JoinHandle<()> {
        let guard = self.guard.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let result = match guard.start(&name).await {
                Ok(state) => state,
                Err(err) => InstanceState::errored(&name, &err),
            };
            Self::emit_transition(&*sink, &name, &result).await;
            entry.finish_start(result);
        })
    }

    async fn emit_transition(sink: &dyn TelemetrySink, name: &str, state: &InstanceState) {
        use crate::instance::Status;
        let event = match state.status {
            Status::Ready => SessionEvent::BecameReady { name: name.to_string(), replicas: state.current_replicas },
            Status::Unrecoverable => {
                SessionEvent::BecameUnrecoverable { name: name.to_string(), message: state.message.clone() }
            }
            Status::Errored => SessionEvent::ProviderError { name: name.to_string(), message: state.message.clone() },
            Status::NotReady => return,
        };
        emit_best_effort(sink, event).await;
    }

    /// `spec.md` §4.4 "RequestDynamic": non-blocking, returns whatever each
    /// name's entry reports right now.
    pub async fn request_dynamic(&self, target: Target, session_duration: Duration) -> Session {
        let names = match self.resolve(&target).await {
            Ok(names) => names,
            Err(failure) => return Session::aggregate(vec![failure]),
        };

        let mut contributions = Vec::with_capacity(names.len());
        for name in &names {
            contributions.push(self.ensure_active(name, session_duration).await);
        }
        Session::aggregate(contributions)
    }

    /// `spec.md` §4.4 "RequestBlocking": waits up to `timeout` for every
    /// not-ready name to settle, then returns a best-effort snapshot.
    /// Cancellation safety: deregistering a waiter (by simply dropping its
    /// future on select/timeout) never cancels the in-flight `Start` — the
    /// entry's `in_flight_start` flag and the provider call live outside
    /// this function's stack.
    pub async fn request_blocking(&self, target: Target, session_duration: Duration, timeout: Duration) -> Session {
        let names = match self.resolve(&target).await {
            Ok(names) => names,
            Err(failure) => return Session::aggregate(vec![failure]),
        };

        let mut contributions = Vec::with_capacity(names.len());
        for name in &names {
            contributions.push(self.ensure_active(name, session_duration).await);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        for (name, contribution) in names.iter().zip(contributions.iter_mut()) {
            if !contribution.status_is_not_ready() {
                continue;
            }
            let (entry, _) = self.store.get_or_create(name, session_duration);
            match entry.wait_ready(deadline).await {
                WaitOutcome::Ready => *contribution = entry.snapshot(),
                WaitOutcome::Unrecoverable(message) => {
                    *contribution = InstanceState::unrecoverable(name, message);
                }
                WaitOutcome::Pending | WaitOutcome::Cancelled => {
                    *contribution = entry.snapshot();
                }
            }
        }

        Session::aggregate(contributions)
    }
}

trait StatusIsNotReady {
    fn status_is_not_ready(&self) -> bool;
}

impl StatusIsNotReady for InstanceState {
    fn status_is_not_ready(&self) -> bool {
        !self.is_ready() && !self.is_unrecoverable()
    }
}
