//! Concurrency-safe map of instance name to session entry, with TTL and
//! refresh-on-touch (`spec.md` §4.3, component C3).
//!
//! Mirrors the generic `CircuitBreakerRegistry` idiom — a global mutex
//! guards only the map's structure, while each entry carries its own lock
//! for field updates — extended with the waiter/broadcast machinery
//! `spec.md` §4.3/§4.4 require for single-flight starts and blocking reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

use crate::instance::InstanceState;
use crate::persistence::PersistedEntry;
use crate::time::Clock;

/// Terminal (or pending) outcome of waiting for an entry to settle.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Pending,
    Ready,
    Unrecoverable(String),
    Cancelled,
}

struct EntryState {
    last: InstanceState,
    expires_at: SystemTime,
    in_flight_start: bool,
}

/// One instance's bookkeeping: last known state, sliding expiry, the
/// single-flight flag, and the waiters blocked on readiness.
///
/// All mutation happens under `state`'s lock, held only for the duration of
/// a field read/write — never across a provider call or an await on
/// `wait_ready`, per `spec.md` §5's "no blocking call under a lock" rule.
pub struct SessionEntry {
    name: String,
    state: Mutex<EntryState>,
    wait_tx: watch::Sender<WaitOutcome>,
}

impl SessionEntry {
    fn new(name: String, initial: InstanceState, expires_at: SystemTime) -> Self {
        let (wait_tx, _rx) = watch::channel(WaitOutcome::Pending);
        Self { name, state: Mutex::new(EntryState { last: initial, expires_at, in_flight_start: false }), wait_tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Point-in-time copy of the last known state.
    pub fn snapshot(&self) -> InstanceState {
        self.state.lock().expect("SessionEntry.snapshot: mutex poisoned").last.clone()
    }

    pub fn expires_at(&self) -> SystemTime {
        self.state.lock().expect("SessionEntry.expires_at: mutex poisoned").expires_at
    }

    /// Extend `expires_at` to `max(now + duration, expires_at)`. Never
    /// shortens an existing expiry (testable property 2).
    pub fn refresh(&self, now: SystemTime, duration: Duration) {
        let mut guard = self.state.lock().expect("SessionEntry.refresh: mutex poisoned");
        let candidate = now + duration;
        if candidate > guard.expires_at {
            guard.expires_at = candidate;
        }
    }

    /// Attempt to become the single caller responsible for issuing `Start`.
    /// Returns `true` exactly once per start cycle; all other concurrent
    /// callers get `false` and must not call the provider.
    pub fn try_begin_start(&self) -> bool {
        let mut guard = self.state.lock().expect("SessionEntry.try_begin_start: mutex poisoned");
        if guard.in_flight_start {
            false
        } else {
            guard.in_flight_start = true;
            true
        }
    }

    /// Record the result of a `Start`/`GetState` call and clear the
    /// in-flight flag. Signals waiters if the new state is terminal
    /// (ready or unrecoverable); a transient `errored` state signals no one,
    /// per `spec.md` §4.5 ("transient provider failures must not destroy
    /// sessions" — nor, by extension, release waiters early).
    pub fn finish_start(&self, result: InstanceState) {
        self.apply(result, true);
    }

    /// Record a new observed state without touching the in-flight flag
    /// (used by the reconciler's refresh sub-task).
    pub fn set_last(&self, result: InstanceState) {
        self.apply(result, false);
    }

    fn apply(&self, result: InstanceState, clear_in_flight: bool) {
        let is_ready = result.is_ready();
        let is_unrecoverable = result.is_unrecoverable();
        let message = result.message.clone();
        {
            let mut guard = self.state.lock().expect("SessionEntry.apply: mutex poisoned");
            guard.last = result;
            if clear_in_flight {
                guard.in_flight_start = false;
            }
        }
        if is_ready {
            let _ = self.wait_tx.send(WaitOutcome::Ready);
        } else if is_unrecoverable {
            let _ = self.wait_tx.send(WaitOutcome::Unrecoverable(message));
        }
    }

    /// Wait for this entry to become ready or unrecoverable, up to
    /// `deadline`. Returns immediately if the entry already settled or is
    /// currently ready (callers are expected to check `snapshot().status`
    /// before calling this — `spec.md` §4.4 only registers a waiter when
    /// the entry is `not-ready`).
    pub async fn wait_ready(&self, deadline: tokio::time::Instant) -> WaitOutcome {
        let mut rx = self.wait_tx.subscribe();
        if !matches!(*rx.borrow(), WaitOutcome::Pending) {
            return rx.borrow().clone();
        }
        tokio::select! {
            changed = rx.changed() => {
                match changed {
                    Ok(()) => rx.borrow().clone(),
                    Err(_) => WaitOutcome::Cancelled,
                }
            }
            _ = tokio::time::sleep_until(deadline) => WaitOutcome::Pending,
        }
    }

    /// Release all pending waiters with a cancellation signal. Idempotent:
    /// does nothing if the entry already settled.
    fn cancel_waiters(&self) {
        let _ = self.wait_tx.send_if_modified(|current| {
            if matches!(current, WaitOutcome::Pending) {
                *current = WaitOutcome::Cancelled;
                true
            } else {
                false
            }
        });
    }
}

/// The session map itself: a global lock for structural changes, per-entry
/// locks for everything else.
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, entries: Mutex::new(HashMap::new()) }
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    /// Atomically fetch the entry for `name`, creating it (with status
    /// `not-ready(0, 0)` as a placeholder until `Start` is called) if
    /// absent. The boolean is `true` exactly for the caller that created it.
    pub fn get_or_create(&self, name: &str, session_duration: Duration) -> (Arc<SessionEntry>, bool) {
        let now = self.clock.now();
        let mut guard = self.entries.lock().expect("SessionStore.get_or_create: mutex poisoned");
        if let Some(entry) = guard.get(name) {
            return (entry.clone(), false);
        }
        let placeholder = InstanceState::not_ready(name, 0, 0);
        let entry = Arc::new(SessionEntry::new(name.to_string(), placeholder, now + session_duration));
        guard.insert(name.to_string(), entry.clone());
        (entry, true)
    }

    pub fn snapshot(&self, name: &str) -> Option<InstanceState> {
        let guard = self.entries.lock().expect("SessionStore.snapshot: mutex poisoned");
        guard.get(name).map(|e| e.snapshot())
    }

    /// Release waiters and drop the entry from the map.
    pub fn remove(&self, name: &str) {
        let entry = {
            let mut guard = self.entries.lock().expect("SessionStore.remove: mutex poisoned");
            guard.remove(name)
        };
        if let Some(entry) = entry {
            entry.cancel_waiters();
        }
    }

    /// A point-in-time list of `(name, entry)` pairs. The global lock is
    /// held only long enough to clone the `Arc`s; callers read each entry's
    /// state independently, so readers never block writers of unrelated
    /// entries.
    pub fn iterate(&self) -> Vec<(String, Arc<SessionEntry>)> {
        let guard = self.entries.lock().expect("SessionStore.iterate: mutex poisoned");
        guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("SessionStore.len: mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed the store from a persisted snapshot without calling the
    /// provider (`spec.md` §6: "the provider is not called during
    /// hydration"). Entries with `expires_at <= now` are the caller's
    /// responsibility to filter out before calling this.
    pub fn hydrate(&self, persisted: Vec<PersistedEntry>) {
        let mut guard = self.entries.lock().expect("SessionStore.hydrate: mutex poisoned");
        for entry in persisted {
            let handle = Arc::new(SessionEntry::new(entry.name.clone(), entry.last, entry.expires_at));
            guard.insert(entry.name, handle);
        }
    }
}
