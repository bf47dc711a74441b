//! Thin façade in front of the engine, consumed by the HTTP layer
//! (`spec.md` §4.6, component C6). Translates a caller's request into the
//! two engine operations and nothing more — response formatting (headers,
//! waiting-page HTML, JSON body) is the HTTP surface's job, not this one.

use std::time::Duration;

use crate::engine::{SessionEngine, Target};
use crate::provider::Provider;
use crate::session::Session;

/// Input common to both strategies: a resolved target and the session
/// duration to apply.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    pub target: Target,
    pub session_duration: Duration,
}

/// `RequestBlocking` additionally needs a timeout (`spec.md` §9: unlike the
/// source, this is a required field here, not an optional one).
#[derive(Debug, Clone)]
pub struct BlockingRequest {
    pub target: Target,
    pub session_duration: Duration,
    pub timeout: Duration,
}

/// The two operations the HTTP layer calls; everything else about
/// `SessionEngine` stays internal to the engine crate.
pub struct Strategy<P> {
    engine: SessionEngine<P>,
}

impl<P> Strategy<P>
where
    P: Provider + 'static,
{
    pub fn new(engine: SessionEngine<P>) -> Self {
        Self { engine }
    }

    pub async fn request_dynamic(&self, request: StrategyRequest) -> Session {
        self.engine.request_dynamic(request.target, request.session_duration).await
    }

    pub async fn request_blocking(&self, request: BlockingRequest) -> Session {
        self.engine.request_blocking(request.target, request.session_duration, request.timeout).await
    }
}
