//! Binary entry point: wires config, provider, engine, reconciler, telemetry
//! and the HTTP surface together, then runs until `Ctrl+C` (SPEC_FULL §6).

mod cli;
mod config;
mod http;
mod provider;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sablier::persistence::{drop_expired, FileSnapshotStore, PersistedEntry, SnapshotStore};
use sablier::provider_guard::{GuardConfig, ProviderGuard};
use sablier::reconciler::Reconciler;
use sablier::store::SessionStore;
use sablier::strategy::Strategy;
use sablier::telemetry::{LogSink, MulticastSink, TelemetrySink};
use sablier::time::SystemClock;
use sablier::SessionEngine;
use sablier_prometheus::PrometheusSink;

use crate::cli::Cli;
use crate::http::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let resolved = config::load(&cli).context("failed to load configuration")?;

    let provider = provider::build(&resolved.provider_name)
        .with_context(|| format!("unknown provider {:?}", resolved.provider_name))?;

    let guard = Arc::new(ProviderGuard::new(
        provider,
        GuardConfig {
            max_concurrent_calls: resolved.engine.provider_bulkhead,
            call_timeout: resolved.engine.provider_call_timeout,
            circuit_breaker: resolved.engine.provider_circuit_breaker.clone(),
        },
    ));

    let registry = Registry::new();
    let prometheus_sink = PrometheusSink::new(registry.clone()).context("failed to register prometheus metrics")?;
    let sink: Arc<dyn TelemetrySink> = Arc::new(MulticastSink::new(LogSink, prometheus_sink));

    let store = Arc::new(SessionStore::new(Arc::new(SystemClock)));
    let snapshot_store = resolved.engine.storage_file.as_ref().map(|path| FileSnapshotStore::new(path.clone()));

    if let Some(snapshot_store) = &snapshot_store {
        hydrate_from_disk(&store, snapshot_store).await;
    }

    let shutdown = CancellationToken::new();
    let intervals = resolved.engine.reconciler_intervals();
    let reconciler = Arc::new(Reconciler::new(store.clone(), guard.clone(), sink.clone(), intervals));
    let reconciler_handles = reconciler.spawn(shutdown.clone());

    let persistence_task = snapshot_store.map(|snapshot_store| {
        spawn_persistence_loop(store.clone(), snapshot_store, resolved.engine.storage_interval, shutdown.clone())
    });

    let engine = SessionEngine::new(store.clone(), guard, sink);
    let strategy = Strategy::new(engine);
    let app_state = Arc::new(AppState { strategy });

    let router = http::router(&resolved.engine.server.base_path, app_state);
    let addr = format!("0.0.0.0:{}", resolved.engine.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, provider = %resolved.provider_name, "sablier-server listening");

    let serve_result = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal(shutdown.clone())).await;

    shutdown.cancel();
    reconciler_handles.join().await;
    if let Some(handle) = persistence_task {
        handle.await.ok();
    }

    serve_result.context("http server error")?;
    info!("sablier-server shut down cleanly");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
    info!("shutdown signal received");
    shutdown.cancel();
}

async fn hydrate_from_disk(store: &SessionStore, snapshot_store: &FileSnapshotStore) {
    match snapshot_store.load().await {
        Ok(entries) => {
            let now = store.now();
            let live = drop_expired(entries, now);
            let count = live.len();
            store.hydrate(live);
            info!(count, "hydrated sessions from disk");
        }
        Err(err) => warn!(error = %err, "failed to load persisted sessions; starting with an empty store"),
    }
}

fn spawn_persistence_loop(
    store: Arc<SessionStore>,
    snapshot_store: FileSnapshotStore,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            let entries: Vec<PersistedEntry> = store
                .iterate()
                .into_iter()
                .map(|(name, entry)| PersistedEntry { name, last: entry.snapshot(), expires_at: entry.expires_at() })
                .collect();
            if let Err(err) = snapshot_store.save(&entries).await {
                warn!(error = %err, "failed to persist session snapshot");
            }
        }
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
