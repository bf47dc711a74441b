//! The logical view returned to callers: an aggregate over one or more
//! instances' states (`spec.md` §3).

use crate::instance::InstanceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    NotReady,
}

/// The outcome of a strategy call: every instance's last known state, plus
/// the aggregate readiness a proxy can key its response on.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub instances: Vec<InstanceState>,
    pub status: SessionStatus,
    /// Set to the first unrecoverable instance's message, if any. A session
    /// can be `not-ready` with no error (still converging).
    pub error: Option<String>,
}

impl Session {
    /// Build the aggregate view: `ready` iff every instance is `ready`;
    /// `error` is the first unrecoverable instance's message, if any.
    pub fn aggregate(instances: Vec<InstanceState>) -> Self {
        let status =
            if instances.iter().all(InstanceState::is_ready) { SessionStatus::Ready } else { SessionStatus::NotReady };
        let error = instances.iter().find(|i| i.is_unrecoverable()).map(|i| i.message.clone());
        Self { instances, status, error }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }
}
