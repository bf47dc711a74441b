//! Minimal end-to-end walkthrough: request an instance, watch it converge,
//! let it go idle and expire.
//!
//! Run with `cargo run --example quickstart --features test-util`.

use std::sync::Arc;
use std::time::Duration;

use sablier::engine::Target;
use sablier::prelude::*;
use sablier::time::SystemClock;

#[tokio::main]
async fn main() {
    println!("=== Sablier quickstart ===\n");

    let provider = MockProvider::new();
    provider.script_not_ready("web", 0, 1);

    let guard = Arc::new(ProviderGuard::new(provider, GuardConfig::default()));
    let store = Arc::new(SessionStore::new(Arc::new(SystemClock)));
    let engine = SessionEngine::new(store.clone(), guard, Arc::new(LogSink));

    println!("1. First request for \"web\" arrives while it's still converging.");
    let session = engine.request_dynamic(Target::Names(vec!["web".into()]), Duration::from_secs(300)).await;
    println!("   -> ready = {}\n", session.is_ready());

    println!("2. A second caller asks the same name and waits up to 2s for readiness.");
    println!("   (in a real deployment the reconciler's refresh sweep would promote it;");
    println!("   here nothing ever reports ready, so the wait times out.)");
    let session = engine.request_blocking(Target::Names(vec!["web".into()]), Duration::from_secs(300), Duration::from_secs(2)).await;
    println!("   -> ready = {}\n", session.is_ready());

    println!("3. Snapshot of the session table right now:");
    match store.snapshot("web") {
        Some(state) => println!("   web: {state:?}"),
        None => println!("   web: <absent>"),
    }
}
