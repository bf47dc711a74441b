//! End-to-end scenarios driving the engine and reconciler together through
//! the public API, with simulated time so the literal timing values hold
//! exactly instead of racing real wall-clock sleeps.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sablier::engine::Target;
use sablier::prelude::*;
use sablier::time::ManualClock;

fn intervals(refresh: Duration, expire: Duration) -> sablier::config::ReconcilerIntervals {
    EngineConfig { refresh_interval: refresh, expire_interval: expire, ..EngineConfig::default() }.reconciler_intervals()
}

fn engine_and_store(
    provider: Arc<MockProvider>,
    clock: Arc<ManualClock>,
) -> (SessionEngine<Arc<MockProvider>>, Arc<SessionStore>, Arc<ProviderGuard<Arc<MockProvider>>>) {
    let store = Arc::new(SessionStore::new(clock));
    let guard = Arc::new(ProviderGuard::new(provider, GuardConfig::default()));
    let engine = SessionEngine::new(store.clone(), guard.clone(), Arc::new(NullSink));
    (engine, store, guard)
}

/// S1: a request before readiness observes `not-ready`; once the provider
/// reports `ready`, the reconciler's next sweep promotes the entry, and a
/// later request observes `ready`. Exactly one `Start` call throughout.
#[tokio::test(start_paused = true)]
async fn s1_dynamic_request_observes_readiness_after_provider_converges() {
    let provider = Arc::new(MockProvider::new());
    provider.script_not_ready("x", 0, 1);
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
    let (engine, store, guard) = engine_and_store(provider.clone(), clock.clone());

    let session = engine.request_dynamic(Target::Names(vec!["x".into()]), Duration::from_secs(300)).await;
    assert!(!session.is_ready());

    let reconciler = Arc::new(Reconciler::new(store.clone(), guard, Arc::new(NullSink), intervals(Duration::from_secs(1), Duration::from_secs(3600))));
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handles = reconciler.spawn(shutdown.clone());

    clock.advance(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(1)).await;
    let session = engine.request_dynamic(Target::Names(vec!["x".into()]), Duration::from_secs(300)).await;
    assert!(!session.is_ready());

    provider.script_ready("x", 1);
    clock.advance(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(1)).await;

    let session = engine.request_dynamic(Target::Names(vec!["x".into()]), Duration::from_secs(300)).await;
    assert!(session.is_ready());
    assert_eq!(provider.start_call_count("x"), 1);

    shutdown.cancel();
    handles.join().await;
}

/// S2: a blocking call against a name that becomes ready partway through
/// the wait returns, by the next refresh sweep, with an aggregate `ready`
/// session — it does not wait out its full timeout once the reconciler has
/// observed readiness.
#[tokio::test(start_paused = true)]
async fn s2_blocking_request_returns_once_reconciler_observes_ready() {
    let provider = Arc::new(MockProvider::new());
    provider.script_not_ready("x", 0, 1);
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
    let (engine, store, guard) = engine_and_store(provider.clone(), clock.clone());
    let engine = Arc::new(engine);

    let reconciler = Arc::new(Reconciler::new(store.clone(), guard, Arc::new(NullSink), intervals(Duration::from_secs(1), Duration::from_secs(3600))));
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handles = reconciler.spawn(shutdown.clone());

    let waiter = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine.request_blocking(Target::Names(vec!["x".into()]), Duration::from_secs(300), Duration::from_secs(30)).await
        })
    };

    clock.advance(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_secs(2)).await;
    provider.script_ready("x", 1);

    clock.advance(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(1)).await;

    let session = waiter.await.unwrap();
    assert!(session.is_ready());

    shutdown.cancel();
    handles.join().await;
}

/// S3: a blocking call with a short timeout against a name that never
/// readies returns `not-ready` at its deadline, and leaves the entry in
/// place for a later caller to observe.
#[tokio::test(start_paused = true)]
async fn s3_blocking_timeout_returns_snapshot_without_removing_entry() {
    let provider = Arc::new(MockProvider::new());
    provider.script_not_ready("x", 0, 1);
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
    let (engine, store, _guard) = engine_and_store(provider, clock);

    let session = engine.request_blocking(Target::Names(vec!["x".into()]), Duration::from_secs(300), Duration::from_secs(1)).await;
    assert!(!session.is_ready());
    assert!(store.snapshot("x").is_some());
}

/// S4: 100 concurrent dynamic requests for the same name before it settles
/// observe exactly one `Start` call — the store's single-flight guarantee.
#[tokio::test]
async fn s4_concurrent_requests_single_flight_one_start_call() {
    let provider = Arc::new(MockProvider::new());
    provider.script_not_ready("x", 0, 1);
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
    let (engine, _store, _guard) = engine_and_store(provider.clone(), clock);
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for _ in 0..100 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.request_dynamic(Target::Names(vec!["x".into()]), Duration::from_secs(300)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(provider.start_call_count("x"), 1);
}

/// S5: a short-lived session with no further traffic is stopped and
/// removed once its expiry sweep runs; a later snapshot finds nothing.
#[tokio::test(start_paused = true)]
async fn s5_idle_session_expires_and_is_stopped() {
    let provider = Arc::new(MockProvider::new());
    provider.script_ready("x", 1);
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
    let (engine, store, guard) = engine_and_store(provider.clone(), clock.clone());

    let session = engine.request_dynamic(Target::Names(vec!["x".into()]), Duration::from_secs(2)).await;
    assert!(session.is_ready());

    let reconciler = Arc::new(Reconciler::new(store.clone(), guard, Arc::new(NullSink), intervals(Duration::from_secs(3600), Duration::from_millis(100))));
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handles = reconciler.spawn(shutdown.clone());

    clock.advance(Duration::from_secs(3));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(store.snapshot("x").is_none());
    assert_eq!(provider.stop_call_count("x"), 1);

    shutdown.cancel();
    handles.join().await;
}

/// S6: a blocking call against a name the provider reports `unrecoverable`
/// for returns promptly with `not-ready` and the message surfaced.
#[tokio::test(start_paused = true)]
async fn s6_unrecoverable_short_circuits_blocking_request() {
    let provider = Arc::new(MockProvider::new());
    provider.script_unrecoverable("dead-instance", "dead");
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
    let (engine, _store, _guard) = engine_and_store(provider, clock);

    let session =
        engine.request_blocking(Target::Names(vec!["dead-instance".into()]), Duration::from_secs(300), Duration::from_secs(30)).await;

    assert!(!session.is_ready());
    let message = session.error.unwrap_or_default();
    assert!(message.contains("dead"), "expected message to mention 'dead', got {message:?}");
}
