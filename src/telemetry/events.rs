use std::fmt;

/// A state transition worth telling the outside world about.
///
/// Emitted by the session engine and reconciler on every change listed
/// below; never carries the caller's session duration/timeout or any other
/// request metadata, only the instance name and the fact that changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A caller asked for this instance and no session existed yet.
    Requested { name: String },
    /// The provider's `start` call was issued.
    Started { name: String },
    /// The provider reports the instance has converged.
    BecameReady { name: String, replicas: u32 },
    /// The provider reports the instance cannot recover.
    BecameUnrecoverable { name: String, message: String },
    /// A provider call failed (transient, not necessarily unrecoverable).
    ProviderError { name: String, message: String },
    /// The session's sliding expiry elapsed and the reconciler is stopping it.
    Expired { name: String },
    /// The provider reported the instance stopped outside of our own `stop` call.
    StoppedByProvider { name: String },
    /// The entry was dropped from the store.
    Removed { name: String },
}

impl SessionEvent {
    /// The instance name this event is about.
    pub fn name(&self) -> &str {
        match self {
            SessionEvent::Requested { name }
            | SessionEvent::Started { name }
            | SessionEvent::BecameReady { name, .. }
            | SessionEvent::BecameUnrecoverable { name, .. }
            | SessionEvent::ProviderError { name, .. }
            | SessionEvent::Expired { name }
            | SessionEvent::StoppedByProvider { name }
            | SessionEvent::Removed { name } => name,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Requested { name } => write!(f, "requested({name})"),
            SessionEvent::Started { name } => write!(f, "started({name})"),
            SessionEvent::BecameReady { name, replicas } => {
                write!(f, "became_ready({name}, replicas={replicas})")
            }
            SessionEvent::BecameUnrecoverable { name, message } => {
                write!(f, "became_unrecoverable({name}): {message}")
            }
            SessionEvent::ProviderError { name, message } => {
                write!(f, "provider_error({name}): {message}")
            }
            SessionEvent::Expired { name } => write!(f, "expired({name})"),
            SessionEvent::StoppedByProvider { name } => write!(f, "stopped_by_provider({name})"),
            SessionEvent::Removed { name } => write!(f, "removed({name})"),
        }
    }
}
