// lock.rs — Advisory file locking.
//
// Ledger appends from concurrent worker threads are serialized by a
// file-level advisory lock acquired on a `.lock` sibling (spec §5). The
// reference implementation uses `flock`-equivalent semantics; this crate
// takes the `O_EXCL`-lockfile fallback the spec explicitly sanctions (§9):
// "on systems lacking flock, implement with O_EXCL lockfile + timeout".
// That keeps locking portable without a platform-specific `flock` binding.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::error::CoreError;

pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 300;
const INITIAL_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 5_000;

/// An advisory lock on `<target>.lock`, released (the lockfile removed)
/// when dropped.
pub struct FileLock {
    lock_path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, polling with exponential backoff until `timeout`
    /// elapses.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self, CoreError> {
        let lock_path = lock_sibling(target);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let start = Instant::now();
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        loop {
            match fs::OpenOptions::new().create_new(true).write(true).open(&lock_path) {
                Ok(_) => return Ok(Self { lock_path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if start.elapsed() >= timeout {
                        return Err(CoreError::LockTimeout {
                            path: target.to_path_buf(),
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    sleep(Duration::from_millis(backoff_ms));
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(e) => return Err(CoreError::io(&lock_path, e)),
            }
        }
    }

    /// Non-blocking variant: returns `Ok(None)` immediately if already held.
    pub fn try_acquire(target: &Path) -> Result<Option<Self>, CoreError> {
        let lock_path = lock_sibling(target);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        match fs::OpenOptions::new().create_new(true).write(true).open(&lock_path) {
            Ok(_) => Ok(Some(Self { lock_path })),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(CoreError::io(&lock_path, e)),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_sibling(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn try_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ledger.jsonl");
        let first = FileLock::try_acquire(&target).unwrap();
        assert!(first.is_some());
        let second = FileLock::try_acquire(&target).unwrap();
        assert!(second.is_none());
        drop(first);
        let third = FileLock::try_acquire(&target).unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn acquire_blocks_until_released_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ledger.jsonl");
        let held = FileLock::try_acquire(&target).unwrap().unwrap();

        let target_clone = target.clone();
        let barrier = Arc::new(Barrier::new(2));
        let barrier_clone = barrier.clone();
        let handle = thread::spawn(move || {
            barrier_clone.wait();
            FileLock::acquire(&target_clone, Duration::from_secs(5)).unwrap();
        });

        barrier.wait();
        thread::sleep(Duration::from_millis(100));
        drop(held);
        handle.join().unwrap();
    }

    #[test]
    fn acquire_times_out_when_never_released() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ledger.jsonl");
        let _held = FileLock::try_acquire(&target).unwrap().unwrap();
        let result = FileLock::acquire(&target, Duration::from_millis(200));
        assert!(matches!(result, Err(CoreError::LockTimeout { .. })));
    }
}
