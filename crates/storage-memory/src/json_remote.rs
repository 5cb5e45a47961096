//! Remote snapshot store backed by a single JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::Mutex;

use ledgerkeep_core::errors::Result;
use ledgerkeep_core::store::RemoteLedgerStore;
use ledgerkeep_core::sync::{LedgerSnapshot, SnapshotOrigin};

use crate::errors::IntoCore;

/// Reads a snapshot file. A missing file means nothing was written yet.
pub async fn read_snapshot(path: &Path) -> Result<Option<LedgerSnapshot>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e).into_core(),
    };
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes).into_core()?;
    Ok(Some(snapshot))
}

/// Writes a snapshot file through a sibling temp file and a rename, so a
/// reader never sees a half-written document.
pub async fn write_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot).into_core()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.into_core()?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json).await.into_core()?;
    tokio::fs::rename(&tmp, path).await.into_core()
}

/// `RemoteLedgerStore` persisting the cloud snapshot as one JSON document.
pub struct JsonFileRemote {
    path: PathBuf,
    // Serializes pull/push within this process.
    io_lock: Mutex<()>,
}

impl JsonFileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RemoteLedgerStore for JsonFileRemote {
    async fn pull(&self) -> Result<Option<LedgerSnapshot>> {
        let _guard = self.io_lock.lock().await;
        let snapshot = read_snapshot(&self.path).await?;
        Ok(snapshot.map(|s| {
            if s.origin != SnapshotOrigin::Cloud {
                warn!(
                    "Remote snapshot at {} is not marked as cloud origin",
                    self.path.display()
                );
            }
            s.with_origin(SnapshotOrigin::Cloud)
        }))
    }

    async fn push(&self, snapshot: LedgerSnapshot) -> Result<()> {
        let _guard = self.io_lock.lock().await;
        write_snapshot(&self.path, &snapshot.with_origin(SnapshotOrigin::Cloud)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ledgerkeep_core::errors::{Error, StoreError};

    fn snapshot() -> LedgerSnapshot {
        LedgerSnapshot::empty(
            SnapshotOrigin::Local,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_pull_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let remote = JsonFileRemote::new(dir.path().join("cloud.json"));
        assert!(remote.pull().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_then_pull_marks_cloud_origin() {
        let dir = tempfile::tempdir().unwrap();
        let remote = JsonFileRemote::new(dir.path().join("nested").join("cloud.json"));

        remote.push(snapshot()).await.unwrap();
        let pulled = remote.pull().await.unwrap().unwrap();

        assert_eq!(pulled.origin, SnapshotOrigin::Cloud);
        assert_eq!(pulled.modified_at, snapshot().modified_at);
        assert!(!dir.path().join("nested").join("cloud.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.json");
        std::fs::write(&path, b"{\"origin\": ").unwrap();

        let err = JsonFileRemote::new(&path).pull().await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Integrity(_))));
    }
}
