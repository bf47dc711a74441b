//! Prometheus metrics sink for Sablier session events.
//! Bring your own `prometheus::Registry`; metrics are registered on construction.

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::{GaugeVec, IntCounterVec, Opts, Registry};
use sablier::telemetry::{SessionEvent, SinkError, TelemetrySink};

/// Emits `sablier_session_events_total{event}` (a counter bumped on every
/// [`SessionEvent`]) and `sablier_active_sessions` (a gauge of the current
/// session count, inferred from `Requested`/`Removed` transitions).
#[derive(Clone, Debug)]
pub struct PrometheusSink {
    registry: Arc<Registry>,
    events_total: IntCounterVec,
    active_sessions: GaugeVec,
}

impl PrometheusSink {
    /// Create a sink and register its metrics into the provided registry.
    ///
    /// # Errors
    /// Returns an error if a metric name collides with one already
    /// registered.
    pub fn new<R: Into<Arc<Registry>>>(registry: R) -> Result<Self, prometheus::Error> {
        let registry = registry.into();
        let events_total = IntCounterVec::new(
            Opts::new("sablier_session_events_total", "Session lifecycle events observed by the engine"),
            &["event"],
        )?;
        let active_sessions = GaugeVec::new(
            Opts::new("sablier_active_sessions", "Sessions currently tracked by the engine"),
            &["instance"],
        )?;
        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(active_sessions.clone()))?;
        Ok(Self { registry, events_total, active_sessions })
    }

    /// Expose the registry for HTTP scraping.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn event_label(event: &SessionEvent) -> &'static str {
        match event {
            SessionEvent::Requested { .. } => "requested",
            SessionEvent::Started { .. } => "started",
            SessionEvent::BecameReady { .. } => "became_ready",
            SessionEvent::BecameUnrecoverable { .. } => "became_unrecoverable",
            SessionEvent::ProviderError { .. } => "provider_error",
            SessionEvent::Expired { .. } => "expired",
            SessionEvent::StoppedByProvider { .. } => "stopped_by_provider",
            SessionEvent::Removed { .. } => "removed",
        }
    }
}

#[async_trait]
impl TelemetrySink for PrometheusSink {
    async fn emit(&self, event: SessionEvent) -> Result<(), SinkError> {
        self.events_total.with_label_values(&[Self::event_label(&event)]).inc();
        match &event {
            SessionEvent::Requested { name } => {
                self.active_sessions.with_label_values(&[name]).set(1.0);
            }
            SessionEvent::Removed { name } => {
                self.active_sessions.with_label_values(&[name]).set(0.0);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_bumps_the_counter_for_its_label() {
        let registry = Registry::new();
        let sink = PrometheusSink::new(registry).unwrap();

        sink.emit(SessionEvent::Requested { name: "web".into() }).await.unwrap();
        sink.emit(SessionEvent::BecameReady { name: "web".into(), replicas: 1 }).await.unwrap();

        let families = sink.registry().gather();
        let events = families.iter().find(|f| f.get_name() == "sablier_session_events_total").unwrap();
        let total: f64 = events.get_metric().iter().map(|m| m.get_counter().get_value()).sum();
        assert_eq!(total, 2.0);
    }

    #[tokio::test]
    async fn requested_and_removed_toggle_the_active_gauge() {
        let registry = Registry::new();
        let sink = PrometheusSink::new(registry).unwrap();

        sink.emit(SessionEvent::Requested { name: "web".into() }).await.unwrap();
        sink.emit(SessionEvent::Removed { name: "web".into() }).await.unwrap();

        let families = sink.registry().gather();
        let gauge = families.iter().find(|f| f.get_name() == "sablier_active_sessions").unwrap();
        assert_eq!(gauge.get_metric()[0].get_gauge().get_value(), 0.0);
    }
}
