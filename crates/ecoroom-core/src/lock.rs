//! Single-writer advisory lock around the store.

use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use crate::error::{Error, Result};

/// Default wait before reporting contention.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// RAII guard for the exclusive write lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the exclusive lock at `path`, retrying until `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockContention`] when another process still holds the
    /// lock after `timeout`, or [`Error::Io`] if the lock file cannot be
    /// created.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("create lock directory {}", parent.display()), e))?;
        }

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(|e| Error::io(format!("open lock file {}", path.display()), e))?;

            if FileExt::try_lock_exclusive(&file).is_ok() {
                tracing::trace!(path = %path.display(), "store lock acquired");
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            if start.elapsed() >= timeout {
                return Err(Error::LockContention {
                    path: path.to_path_buf(),
                    waited_ms: start.elapsed().as_millis(),
                });
            }

            thread::sleep(RETRY_INTERVAL);
        }
    }

    /// Explicitly release the lock. Release also happens automatically on drop.
    pub fn release(self) {
        drop(self);
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::StoreLock;
    use crate::error::{Error, ErrorCode};
    use std::time::Duration;

    #[test]
    fn lock_allows_acquire_and_release() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(".ecoroom").join("lock");
        let lock = StoreLock::acquire(&path, Duration::from_millis(50)).expect("acquire");
        assert_eq!(lock.path(), path.as_path());
        lock.release();

        let again = StoreLock::acquire(&path, Duration::from_millis(50));
        assert!(again.is_ok());
    }

    #[test]
    fn lock_times_out_when_held() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lock");
        let _guard = StoreLock::acquire(&path, Duration::from_millis(50)).expect("first");

        let err = StoreLock::acquire(&path, Duration::from_millis(20)).expect_err("contention");
        assert!(matches!(&err, Error::LockContention { path: p, .. } if *p == path));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
    }
}
