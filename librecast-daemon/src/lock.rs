//! Single-instance lock file.
//!
//! The running daemon holds an exclusive advisory lock on the file for its
//! whole lifetime and records its pid in it as decimal text. Clients open the
//! same file read-only, without locking, to learn which process to signal.
//! The file is left in place on exit; a stale pid is detected at signal time.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::LockError;

/// Exclusive ownership of the lock file. Dropping the guard releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    file: File,
    pid: u32,
}

impl LockGuard {
    /// Create (if needed) and lock `path`, then record the current pid.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyRunning`] if another process holds the lock,
    /// [`LockError::Open`] for any other open or lock failure and
    /// [`LockError::WriteFail`] if the pid cannot be recorded.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| LockError::Open {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        if let Err(err) = file.try_lock_exclusive() {
            if is_contended(&err) {
                let pid = read_pid(&file).ok().and_then(|content| parse_pid(&content));
                return Err(LockError::AlreadyRunning { path, pid });
            }
            return Err(LockError::Open { path, source: err });
        }

        // From here on `file` owns the lock; any early return drops it.
        let pid = std::process::id();
        write_pid(&file, pid).map_err(|source| LockError::WriteFail {
            path: path.clone(),
            source,
        })?;

        tracing::info!(pid, path = %path.display(), "lock acquired");
        Ok(Self { path, file, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %err, "lock release failed");
        } else {
            tracing::debug!(path = %self.path.display(), "lock released");
        }
    }
}

/// Read-only view of the lock file, used by clients. Never locks.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    file: File,
}

impl LockFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| LockError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, file })
    }

    /// The pid recorded by the daemon.
    pub fn read_identity(&self) -> Result<u32, LockError> {
        let content = read_pid(&self.file).map_err(|source| LockError::ReadFail {
            path: self.path.clone(),
            source,
        })?;
        parse_pid(&content).ok_or_else(|| LockError::Invalid {
            path: self.path.clone(),
            content: content.trim().to_string(),
        })
    }
}

/// A positive decimal pid that fits a signed `pid_t`. Surrounding whitespace
/// is tolerated; anything else is not.
pub fn parse_pid(content: &str) -> Option<u32> {
    let pid = content.trim().parse::<u32>().ok()?;
    (pid > 0 && pid <= i32::MAX as u32).then_some(pid)
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn read_pid(mut file: &File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

fn write_pid(mut file: &File, pid: u32) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(pid.to_string().as_bytes())?;
    file.sync_all()
}
