//! Background sweep that keeps the session table honest: refreshes stale
//! readiness, stops and removes expired entries, and (when the provider
//! supports it) reacts to out-of-band stop events (`spec.md` §4.5,
//! component C5).
//!
//! Two independently-paced sub-tasks plus an optional stop-event consumer,
//! all spawned under one `CancellationToken` so a single shutdown signal
//! drains every one of them.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ReconcilerIntervals;
use crate::instance::InstanceState;
use crate::provider::Provider;
use crate::provider_guard::ProviderGuard;
use crate::store::SessionStore;
use crate::telemetry::{emit_best_effort, SessionEvent, TelemetrySink};

/// Owns the store and guard handles the sweep needs; does not own the
/// engine itself — the reconciler and the engine are peers over the same
/// store, never layered on top of one another.
pub struct Reconciler<P> {
    store: Arc<SessionStore>,
    guard: Arc<ProviderGuard<P>>,
    sink: Arc<dyn TelemetrySink>,
    intervals: ReconcilerIntervals,
}

impl<P> Reconciler<P>
where
    P: Provider + 'static,
{
    pub fn new(
        store: Arc<SessionStore>,
        guard: Arc<ProviderGuard<P>>,
        sink: Arc<dyn TelemetrySink>,
        intervals: ReconcilerIntervals,
    ) -> Self {
        Self { store, guard, sink, intervals }
    }

    /// Spawn the refresh and expirer sub-tasks. Both stop, draining any
    /// in-flight provider call, once `shutdown` is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> ReconcilerHandles {
        let refresh = {
            let this = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { this.run_refresh(shutdown).await })
        };
        let expire = {
            let this = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { this.run_expire(shutdown).await })
        };
        ReconcilerHandles { refresh, expire }
    }

    /// `spec.md` §4.5 refresh sub-task: poll `GetState` for every entry
    /// that hasn't settled yet. A transient error becomes `errored` on the
    /// entry — never removed, never signalled, the next sweep retries.
    async fn run_refresh(&self, shutdown: CancellationToken) {
        loop {
            let interval = *self.intervals.refresh.get();
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }

            for (name, entry) in self.store.iterate() {
                let last = entry.snapshot();
                if last.is_ready() || last.is_unrecoverable() {
                    continue;
                }
                match self.guard.get_state(&name).await {
                    Ok(state) => {
                        let became_ready = state.is_ready();
                        let became_unrecoverable = state.is_unrecoverable();
                        entry.set_last(state.clone());
                        if became_ready {
                            emit_best_effort(
                                &*self.sink,
                                SessionEvent::BecameReady { name: name.clone(), replicas: state.current_replicas },
                            )
                            .await;
                        } else if became_unrecoverable {
                            emit_best_effort(
                                &*self.sink,
                                SessionEvent::BecameUnrecoverable { name: name.clone(), message: state.message.clone() },
                            )
                            .await;
                        }
                    }
                    Err(err) => {
                        entry.set_last(InstanceState::errored(name.as_str(), &err));
                        emit_best_effort(
                            &*self.sink,
                            SessionEvent::ProviderError { name: name.clone(), message: err.to_string() },
                        )
                        .await;
                    }
                }
            }
        }
    }

    /// `spec.md` §4.5 expirer sub-task: stop and remove anything whose
    /// sliding expiry has elapsed. A failed `Stop` leaves the entry for the
    /// next sweep to retry — no data loss, no silent removal.
    async fn run_expire(&self, shutdown: CancellationToken) {
        loop {
            let interval = *self.intervals.expire.get();
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }

            let now = self.store.now();
            for (name, entry) in self.store.iterate() {
                if entry.expires_at() > now {
                    continue;
                }
                match self.guard.stop(&name).await {
                    Ok(_) => {
                        self.store.remove(&name);
                        emit_best_effort(&*self.sink, SessionEvent::Expired { name: name.clone() }).await;
                        emit_best_effort(&*self.sink, SessionEvent::Removed { name }).await;
                    }
                    Err(err) => {
                        emit_best_effort(
                            &*self.sink,
                            SessionEvent::ProviderError { name: name.clone(), message: err.to_string() },
                        )
                        .await;
                    }
                }
            }
        }
    }

    /// `spec.md` §4.5 stop-event consumer: when the provider can push
    /// out-of-band stop notifications, drain them into `store.remove`
    /// until `shutdown` fires. Providers with no such signal never resolve
    /// this future in practice — `Provider::notify_stopped`'s default is a
    /// one-shot `Ok(())`, so callers that care should race it against
    /// `shutdown` exactly as this does.
    pub async fn run_stop_events(&self, name: &str, shutdown: CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            result = self.guard.notify_stopped(name) => {
                if result.is_ok() {
                    self.store.remove(name);
                    emit_best_effort(&*self.sink, SessionEvent::StoppedByProvider { name: name.to_string() }).await;
                }
            }
        }
    }
}

pub struct ReconcilerHandles {
    pub refresh: tokio::task::JoinHandle<()>,
    pub expire: tokio::task::JoinHandle<()>,
}

impl ReconcilerHandles {
    pub async fn join(self) {
        let _ = tokio::join!(self.refresh, self.expire);
    }
}
