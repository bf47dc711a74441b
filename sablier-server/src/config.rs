//! Merges defaults, an optional `config.toml`, environment variables, and
//! CLI flags into a [`sablier::config::EngineConfig`] plus the provider
//! selection, in that increasing order of precedence (SPEC_FULL §4.9).
//!
//! `clap`'s `env` attribute already folds the env layer into the CLI layer
//! by the time [`Cli`] is parsed, so this module only has two layers left to
//! reconcile: the file and the already-merged flag/env values.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use sablier::config::{EngineConfig, ServerConfig};

use crate::cli::Cli;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Shape of `config.toml`. Every field is optional — whatever it doesn't
/// set falls through to the CLI/env layer's value, and ultimately to
/// [`EngineConfig::default`].
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    provider: FileProviderConfig,
    #[serde(default)]
    server: FileServerConfig,
    #[serde(default)]
    storage: FileStorageConfig,
    #[serde(default, with = "humantime_serde_option")]
    refresh_interval: Option<Duration>,
    #[serde(default, with = "humantime_serde_option")]
    expire_check_interval: Option<Duration>,
    #[serde(default, with = "humantime_serde_option")]
    session_duration_default: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
struct FileProviderConfig {
    name: Option<String>,
    #[serde(default, with = "humantime_serde_option")]
    timeout: Option<Duration>,
    circuit_breaker_threshold: Option<usize>,
    #[serde(default, with = "humantime_serde_option")]
    circuit_breaker_recovery: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServerConfig {
    port: Option<u16>,
    base_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileStorageConfig {
    file: Option<PathBuf>,
}

/// `serde_with`-style helper for an `Option<Duration>` field backed by
/// `humantime`'s string format, without pulling in `humantime-serde` as a
/// separate dependency for one field shape.
mod humantime_serde_option {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom)).transpose()
    }
}

pub const DEFAULT_PROVIDER_NAME: &str = "mock";

/// The fully-resolved configuration the binary runs with.
pub struct ResolvedConfig {
    pub engine: EngineConfig,
    pub provider_name: String,
}

/// Load `path` (if given), merge it under `cli`'s already-flag/env-resolved
/// values, and produce a [`ResolvedConfig`]. A missing file is fine; a
/// malformed one is a hard error.
pub fn load(cli: &Cli) -> Result<ResolvedConfig, ConfigError> {
    let file = match &cli.config {
        Some(path) => read_file_config(path)?,
        None => FileConfig::default(),
    };

    let defaults = EngineConfig::default();

    let provider_name = cli
        .provider_name
        .clone()
        .or(file.provider.name)
        .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string());

    let mut engine = defaults;
    engine.session_duration_default = file.session_duration_default.unwrap_or(engine.session_duration_default);
    engine.refresh_interval = cli.refresh_interval.or(file.refresh_interval).unwrap_or(engine.refresh_interval);
    engine.expire_interval =
        cli.expire_check_interval.or(file.expire_check_interval).unwrap_or(engine.expire_interval);
    engine.provider_call_timeout =
        cli.provider_timeout.or(file.provider.timeout).unwrap_or(engine.provider_call_timeout);
    engine.provider_circuit_breaker.failure_threshold = cli
        .provider_circuit_breaker_threshold
        .or(file.provider.circuit_breaker_threshold)
        .unwrap_or(engine.provider_circuit_breaker.failure_threshold);
    engine.provider_circuit_breaker.recovery_timeout = cli
        .provider_circuit_breaker_recovery
        .or(file.provider.circuit_breaker_recovery)
        .unwrap_or(engine.provider_circuit_breaker.recovery_timeout);
    engine.storage_file = cli.storage_file.clone().or(file.storage.file);
    engine.server = ServerConfig {
        port: cli.server_port.or(file.server.port).unwrap_or(engine.server.port),
        base_path: cli.server_base_path.clone().or(file.server.base_path).unwrap_or(engine.server.base_path),
    };

    Ok(ResolvedConfig { engine, provider_name })
}

fn read_file_config(path: &PathBuf) -> Result<FileConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(body) => {
            toml::from_str(&body).map_err(|source| ConfigError::Parse { path: path.clone(), source })
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(source) => Err(ConfigError::Read { path: path.clone(), source }),
    }
}
