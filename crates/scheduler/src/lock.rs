//! crates/scheduler/src/lock.rs
//! The system-wide run lock.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use fs2::FileExt;
use thiserror::Error;

/// Failure to take the run lock.
///
/// `Held` is deliberately distinct from I/O trouble: a held lock means
/// another scheduler is (or recently was) running and this invocation must
/// stop; an I/O error means the environment is broken.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file already exists.
    #[error(
        "lock file {path} is already held; if the previous run crashed, remove it manually"
    )]
    Held {
        /// The configured lock path.
        path: PathBuf,
    },
    /// The lock file could not be created or locked.
    #[error("failed to create lock file {path}: {source}")]
    Io {
        /// The configured lock path.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
}

/// Advisory lock held for the lifetime of one scheduler run.
///
/// Acquisition is exclusive file creation — presence means held, and a
/// second concurrent acquisition fails immediately rather than polling.
/// The guard removes the file when dropped, so release is scope-guaranteed
/// on every exit path including panic unwinds. Only a hard process kill can
/// leave the file behind, and that stale file then requires manual removal
/// (recognised operational procedure, intentionally not auto-expired).
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// Takes the lock at `path`, writing the holder's pid into the file.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                if let Ok(contents) = fs::read_to_string(path) {
                    tracing::warn!(
                        target: "puller::lock",
                        holder = contents.trim(),
                        "run lock already held"
                    );
                }
                return Err(LockError::Held {
                    path: path.to_path_buf(),
                });
            }
            Err(error) => {
                return Err(LockError::Io {
                    path: path.to_path_buf(),
                    source: error,
                });
            }
        };
        let locked = file
            .try_lock_exclusive()
            .and_then(|()| writeln!(file, "{}", process::id()));
        if let Err(error) = locked {
            let _ = fs::remove_file(path);
            return Err(LockError::Io {
                path: path.to_path_buf(),
                source: error,
            });
        }
        tracing::debug!(target: "puller::lock", path = %path.display(), "run lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Releases the lock by dropping the guard.
    pub fn release(self) {}
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        if let Err(error) = fs::remove_file(&self.path) {
            tracing::warn!(
                target: "puller::lock",
                path = %self.path.display(),
                %error,
                "failed to remove lock file"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_fails_fast_with_held() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let first = RunLock::acquire(&path).unwrap();
        let second = RunLock::acquire(&path);
        assert!(matches!(second, Err(LockError::Held { .. })));

        first.release();
        let third = RunLock::acquire(&path);
        assert!(third.is_ok());
    }

    #[test]
    fn release_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert!(path.exists());
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn lock_file_records_the_holder_pid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let _lock = RunLock::acquire(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), process::id().to_string());
    }

    #[test]
    fn unwinding_releases_the_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");
        let path_for_thread = path.clone();

        let result = std::thread::spawn(move || {
            let _lock = RunLock::acquire(&path_for_thread).unwrap();
            panic!("simulated crash after lock()");
        })
        .join();

        assert!(result.is_err());
        assert!(!path.exists(), "unwind must release the lock");
    }

    #[test]
    fn unwritable_path_is_io_not_held() {
        let result = RunLock::acquire(Path::new("/definitely/missing/dir/run.lock"));

        assert!(matches!(result, Err(LockError::Io { .. })));
    }
}
