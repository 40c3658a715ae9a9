//! Exclusive lock guarding the state file against overlapping runs.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;

use crate::error::{AppError, Result};

/// Lock file held for the lifetime of a run; removed on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    /// Lock file path for a state file: `<state>.lock`.
    pub fn lock_path(state_path: &Path) -> PathBuf {
        let mut name = state_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock, replacing a leftover lock older than `stale_after`.
    pub fn acquire(state_path: &Path, stale_after: Duration) -> Result<Self> {
        let path = Self::lock_path(state_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !Self::take_over(&path, stale_after)? {
                    return Err(AppError::locked(&path));
                }
                log::warn!("Removed stale lock file {}", path.display());
                Self::create(&path).map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => AppError::locked(&path),
                    _ => AppError::Io(e),
                })
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        Self::create_with(path, |file| {
            writeln!(
                file,
                "pid={} acquired_at={}",
                std::process::id(),
                Utc::now().to_rfc3339()
            )
        })
    }

    /// Create the lock file and fill it with `write`; the file is removed
    /// again if `write` fails.
    fn create_with(
        path: &Path,
        write: impl FnOnce(&mut File) -> std::io::Result<()>,
    ) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let lock = Self {
            path: path.to_path_buf(),
        };
        write(&mut file)?;
        file.sync_all()?;
        log::debug!("Acquired state lock {}", path.display());
        Ok(lock)
    }

    /// Remove the lock at `path` if it is stale. Returns whether the caller
    /// may try to create the lock again.
    fn take_over(path: &Path, stale_after: Duration) -> std::io::Result<bool> {
        let observed = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        };
        if !Self::is_stale(path, stale_after) {
            return Ok(false);
        }
        Self::evict(path, &observed)
    }

    /// Move the lock aside and drop it, but only if it still holds
    /// `observed`. A lock taken by another run in the meantime is put back.
    fn evict(path: &Path, observed: &[u8]) -> std::io::Result<bool> {
        let mut aside = path.as_os_str().to_owned();
        aside.push(format!(".stale.{}", std::process::id()));
        let aside = PathBuf::from(aside);

        match fs::rename(path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        }

        if fs::read(&aside)? != observed {
            log::debug!("Lock {} was renewed by another run", path.display());
            let _ = fs::hard_link(&aside, path);
            let _ = fs::remove_file(&aside);
            return Ok(false);
        }

        fs::remove_file(&aside)?;
        Ok(true)
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > stale_after)
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        } else {
            log::debug!("Released state lock {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_lock_path_appends_suffix() {
        assert_eq!(
            StateLock::lock_path(Path::new("state/seen_ids.json")),
            PathBuf::from("state/seen_ids.json.lock")
        );
    }

    #[test]
    fn test_second_acquire_fails_until_released() {
        let tmp = TempDir::new().unwrap();
        let state = tmp.path().join("seen_ids.json");

        let lock = StateLock::acquire(&state, HOUR).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            StateLock::acquire(&state, HOUR),
            Err(AppError::Locked { .. })
        ));

        drop(lock);
        assert!(!StateLock::lock_path(&state).exists());
        assert!(StateLock::acquire(&state, HOUR).is_ok());
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let state = tmp.path().join("seen_ids.json");
        fs::write(StateLock::lock_path(&state), "pid=1").unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let lock = StateLock::acquire(&state, Duration::from_millis(1)).unwrap();
        assert!(lock.path().exists());
    }

    #[test]
    fn test_fresh_lock_is_not_taken_over() {
        let tmp = TempDir::new().unwrap();
        let lock_path = StateLock::lock_path(&tmp.path().join("seen_ids.json"));
        fs::write(&lock_path, "pid=1").unwrap();

        assert!(!StateLock::take_over(&lock_path, HOUR).unwrap());
        assert_eq!(fs::read_to_string(&lock_path).unwrap(), "pid=1");
    }

    #[test]
    fn test_renewed_lock_is_put_back() {
        let tmp = TempDir::new().unwrap();
        let lock_path = StateLock::lock_path(&tmp.path().join("seen_ids.json"));
        fs::write(&lock_path, "pid=2 acquired_at=now").unwrap();

        // The stale lock seen earlier was replaced before the eviction ran.
        assert!(!StateLock::evict(&lock_path, b"pid=1 acquired_at=long ago").unwrap());
        assert_eq!(
            fs::read_to_string(&lock_path).unwrap(),
            "pid=2 acquired_at=now"
        );
        let leftovers = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_evict_removes_unchanged_lock() {
        let tmp = TempDir::new().unwrap();
        let lock_path = StateLock::lock_path(&tmp.path().join("seen_ids.json"));
        fs::write(&lock_path, "pid=1").unwrap();

        assert!(StateLock::evict(&lock_path, b"pid=1").unwrap());
        assert!(!lock_path.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_removes_lock_file() {
        let tmp = TempDir::new().unwrap();
        let lock_path = StateLock::lock_path(&tmp.path().join("seen_ids.json"));

        let result = StateLock::create_with(&lock_path, |_| {
            Err(std::io::Error::other("disk full"))
        });
        assert!(result.is_err());
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let state = tmp.path().join("nested/dir/seen_ids.json");
        let lock = StateLock::acquire(&state, HOUR).unwrap();
        assert!(lock.path().exists());
    }
}
