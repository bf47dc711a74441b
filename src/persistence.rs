//! Best-effort durability of the session table across restarts
//! (`spec.md` §6 "Persisted state layout", SPEC_FULL §4.10).
//!
//! Not a source of truth: if the file is missing, stale, or corrupt, the
//! reconciler's next sweep rediscovers the real state from the provider.
//! Hydration never calls the provider (`spec.md` §6).

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::instance::InstanceState;

/// The three fields `spec.md` §6 names — no waiters, no in-flight flags.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEntry {
    pub name: String,
    pub last: InstanceState,
    pub expires_at: SystemTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEntry {
    name: String,
    current_replicas: u32,
    desired_replicas: u32,
    status: WireStatus,
    message: String,
    expires_at_unix_millis: u64,
}

#[derive(Debug, Serialize, Deserialize)]
enum WireStatus {
    Ready,
    NotReady,
    Unrecoverable,
    Errored,
}

impl From<crate::instance::Status> for WireStatus {
    fn from(status: crate::instance::Status) -> Self {
        match status {
            crate::instance::Status::Ready => WireStatus::Ready,
            crate::instance::Status::NotReady => WireStatus::NotReady,
            crate::instance::Status::Unrecoverable => WireStatus::Unrecoverable,
            crate::instance::Status::Errored => WireStatus::Errored,
        }
    }
}

impl From<WireStatus> for crate::instance::Status {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Ready => crate::instance::Status::Ready,
            WireStatus::NotReady => crate::instance::Status::NotReady,
            WireStatus::Unrecoverable => crate::instance::Status::Unrecoverable,
            WireStatus::Errored => crate::instance::Status::Errored,
        }
    }
}

fn to_wire(entry: &PersistedEntry) -> WireEntry {
    let millis = entry
        .expires_at
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
        .min(u128::from(u64::MAX)) as u64;
    WireEntry {
        name: entry.name.clone(),
        current_replicas: entry.last.current_replicas,
        desired_replicas: entry.last.desired_replicas,
        status: entry.last.status.into(),
        message: entry.last.message.clone(),
        expires_at_unix_millis: millis,
    }
}

fn from_wire(wire: WireEntry) -> PersistedEntry {
    PersistedEntry {
        name: wire.name.clone(),
        last: InstanceState {
            name: wire.name,
            current_replicas: wire.current_replicas,
            desired_replicas: wire.desired_replicas,
            status: wire.status.into(),
            message: wire.message,
        },
        expires_at: UNIX_EPOCH + Duration::from_millis(wire.expires_at_unix_millis),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable store for the session table's snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, entries: &[PersistedEntry]) -> Result<(), PersistError>;
    async fn load(&self) -> Result<Vec<PersistedEntry>, PersistError>;
}

/// Newline-delimited JSON on disk, written atomically (temp file + rename)
/// so a crash mid-write never corrupts the previous snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, entries: &[PersistedEntry]) -> Result<(), PersistError> {
        let mut body = String::new();
        for entry in entries {
            let wire = to_wire(entry);
            body.push_str(&serde_json::to_string(&wire)?);
            body.push('\n');
        }

        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<PersistedEntry>, PersistError> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for line in body.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let wire: WireEntry = serde_json::from_str(line)?;
            entries.push(from_wire(wire));
        }
        Ok(entries)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Drop entries whose expiry has already elapsed; the reconciler's next
/// sweep would just stop-and-remove them anyway, and hydration must not
/// call the provider to find that out early.
pub fn drop_expired(entries: Vec<PersistedEntry>, now: SystemTime) -> Vec<PersistedEntry> {
    entries.into_iter().filter(|e| e.expires_at > now).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("sablier-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("sessions.ndjson");
        let store = FileSnapshotStore::new(&path);

        let entries = vec![
            PersistedEntry { name: "a".into(), last: InstanceState::ready("a", 2), expires_at: UNIX_EPOCH + Duration::from_secs(100) },
            PersistedEntry { name: "b".into(), last: InstanceState::unrecoverable("b", "dead"), expires_at: UNIX_EPOCH + Duration::from_secs(50) },
        ];
        store.save(&entries).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, entries);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn load_missing_file_returns_empty() {
        let store = FileSnapshotStore::new("/nonexistent/sablier-does-not-exist.ndjson");
        let loaded = store.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn drop_expired_filters_past_entries() {
        let now = UNIX_EPOCH + Duration::from_secs(100);
        let entries = vec![
            PersistedEntry { name: "fresh".into(), last: InstanceState::ready("fresh", 1), expires_at: now + Duration::from_secs(1) },
            PersistedEntry { name: "stale".into(), last: InstanceState::ready("stale", 1), expires_at: now - Duration::from_secs(1) },
        ];
        let kept = drop_expired(entries, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "fresh");
    }
}
