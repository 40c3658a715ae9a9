//! Local filesystem storage implementation.
//!
//! Keeps the seen set in one JSON file next to the working copy, where the
//! CI job that schedules the monitor can pick it up and commit it.
//!
//! ## Storage Layout
//!
//! ```text
//! {dir}/
//! ├── seen_ids.json         # Seen set (written atomically)
//! └── seen_ids.json.lock    # Present while a run holds the store
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::SeenSet;
use crate::storage::{SeenState, SeenStore, StateFile, StateLock, parse_state};

/// Local filesystem storage backend.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    read_only: bool,
    _lock: Option<StateLock>,
}

impl LocalStorage {
    /// Open the store for a run, holding the state lock until dropped.
    pub fn open(path: impl Into<PathBuf>, stale_lock_after: Duration) -> Result<Self> {
        let path = path.into();
        let lock = StateLock::acquire(&path, stale_lock_after)?;
        Ok(Self {
            path,
            read_only: false,
            _lock: Some(lock),
        })
    }

    /// Open the store for inspection; `save` is a no-op and no lock is taken.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
            _lock: None,
        }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.tmp_path();
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::state_write(&self.path, e));
        }
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SeenStore for LocalStorage {
    async fn load(&self) -> SeenState {
        let bytes = match self.read_bytes().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!("No state file at {}; treating as first run", self.path.display());
                return SeenState::missing();
            }
            Err(e) => {
                log::warn!(
                    "Failed to read {}: {}. Starting from an empty seen set.",
                    self.path.display(),
                    e
                );
                return SeenState::recovered();
            }
        };

        match parse_state(&bytes) {
            Ok(state) => {
                log::info!(
                    "Loaded {} seen ids from {}",
                    state.ids.len(),
                    self.path.display()
                );
                state
            }
            Err(e) => {
                log::warn!(
                    "State file {} is malformed: {}. Starting from an empty seen set.",
                    self.path.display(),
                    e
                );
                SeenState::recovered()
            }
        }
    }

    async fn save(&self, ids: &SeenSet) -> Result<()> {
        if self.read_only {
            log::info!(
                "Read-only store: skipping write of {} ids to {}",
                ids.len(),
                self.path.display()
            );
            return Ok(());
        }

        let bytes = serde_json::to_vec_pretty(&StateFile::new(ids.clone()))?;
        self.write_bytes(&bytes).await?;
        log::info!("Saved {} seen ids to {}", ids.len(), self.path.display());
        Ok(())
    }
}
