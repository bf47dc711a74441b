//! Flag/env surface for the binary. Every flag also binds to a `SABLIER_*`
//! environment variable via `clap`'s `env` attribute; the config-file layer
//! sits below both and is merged separately in [`crate::config`].

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|err| err.to_string())
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sablier-server", about = "On-demand workload activation", version)]
pub struct Cli {
    /// Optional TOML config file; silently absent is fine, malformed is fatal.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Which provider backend to activate workloads through.
    #[arg(long = "provider.name", env = "SABLIER_PROVIDER_NAME", value_name = "NAME")]
    pub provider_name: Option<String>,

    /// Port the HTTP surface listens on.
    #[arg(long = "server.port", env = "SABLIER_SERVER_PORT", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Path prefix the two strategy routes are mounted under.
    #[arg(long = "server.base-path", env = "SABLIER_SERVER_BASE_PATH", value_name = "PATH")]
    pub server_base_path: Option<String>,

    /// File the session table is periodically snapshotted to. Unset disables persistence.
    #[arg(long = "storage.file", env = "SABLIER_STORAGE_FILE", value_name = "PATH")]
    pub storage_file: Option<PathBuf>,

    /// How often the reconciler polls `GetState` for not-yet-settled instances.
    #[arg(long = "refresh-interval", env = "SABLIER_REFRESH_INTERVAL", value_parser = parse_duration, value_name = "DURATION")]
    pub refresh_interval: Option<Duration>,

    /// How often the reconciler sweeps for expired sessions.
    #[arg(long = "expire-check-interval", env = "SABLIER_EXPIRE_CHECK_INTERVAL", value_parser = parse_duration, value_name = "DURATION")]
    pub expire_check_interval: Option<Duration>,

    /// Per-call timeout applied to every provider call.
    #[arg(long = "provider.timeout", env = "SABLIER_PROVIDER_TIMEOUT", value_parser = parse_duration, value_name = "DURATION")]
    pub provider_timeout: Option<Duration>,

    /// Consecutive provider failures before the guard's circuit breaker opens.
    #[arg(long = "provider.circuit-breaker-threshold", env = "SABLIER_PROVIDER_CIRCUIT_BREAKER_THRESHOLD", value_name = "N")]
    pub provider_circuit_breaker_threshold: Option<usize>,

    /// How long the circuit breaker stays open before probing again.
    #[arg(long = "provider.circuit-breaker-recovery", env = "SABLIER_PROVIDER_CIRCUIT_BREAKER_RECOVERY", value_parser = parse_duration, value_name = "DURATION")]
    pub provider_circuit_breaker_recovery: Option<Duration>,
}
