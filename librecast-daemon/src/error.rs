use std::path::PathBuf;

use thiserror::Error;

use librecast_core::{ConfigError, ErrorCode};
use librecast_net::NetError;

/// Lock file failures.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to open pidfile {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("daemon already running (pidfile {path}{})", holder(.pid))]
    AlreadyRunning { path: PathBuf, pid: Option<u32> },

    #[error("failed to read pidfile {path}: {source}")]
    ReadFail {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pid '{content}' in {path}")]
    Invalid { path: PathBuf, content: String },

    #[error("failed to write to pidfile {path}: {source}")]
    WriteFail {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn holder(pid: &Option<u32>) -> String {
    match pid {
        Some(pid) => format!(", pid {pid}"),
        None => String::new(),
    }
}

impl LockError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LockError::Open { .. } => ErrorCode::PidOpen,
            LockError::AlreadyRunning { .. } => ErrorCode::AlreadyRunning,
            LockError::ReadFail { .. } => ErrorCode::PidReadFail,
            LockError::Invalid { .. } => ErrorCode::PidInvalid,
            LockError::WriteFail { .. } => ErrorCode::PidWriteFail,
        }
    }

    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            LockError::Open { source, .. }
            | LockError::ReadFail { source, .. }
            | LockError::WriteFail { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Control command failures.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid command '{0}'; expected 'stop' or 'reload'")]
    InvalidCommand(String),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// The recorded pid no longer exists. Informational, not a failure.
    #[error("daemon not running (stale pid {pid})")]
    DaemonStopped { pid: u32 },

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

impl ControlError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ControlError::InvalidCommand(_) => ErrorCode::InvalidArgs,
            ControlError::Lock(err) => err.code(),
            ControlError::DaemonStopped { .. } => ErrorCode::DaemonStopped,
            ControlError::Signal { .. } => ErrorCode::Failure,
        }
    }

    pub fn is_benign(&self) -> bool {
        matches!(self, ControlError::DaemonStopped { .. })
    }

    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            ControlError::Lock(err) => err.io_error(),
            ControlError::Signal { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error surface for the daemon driver.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("network error: {0}")]
    Net(#[from] NetError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DaemonError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DaemonError::Config(err) => err.code(),
            DaemonError::Lock(err) => err.code(),
            DaemonError::Net(err) => err.code(),
            DaemonError::Io { .. } | DaemonError::Json(_) => ErrorCode::Failure,
        }
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            DaemonError::Config(err) => err.raw_os_error(),
            DaemonError::Lock(err) => err.io_error().and_then(std::io::Error::raw_os_error),
            DaemonError::Net(err) => err.raw_os_error(),
            DaemonError::Io { source, .. } => source.raw_os_error(),
            DaemonError::Json(_) => None,
        }
    }

    /// One-line report: process-defined message, then the detailed cause
    /// (which carries the OS error where there is one).
    pub fn report(&self) -> String {
        format!("{}: {self}", self.code())
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.code().as_i32()).unwrap_or(1)
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_and_os_error_follow_the_inner_error() {
        let err = DaemonError::from(LockError::Open {
            path: PathBuf::from("/run/librecastd.pid"),
            // EACCES
            source: std::io::Error::from_raw_os_error(13),
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.raw_os_error(), Some(13));
        assert!(err.report().starts_with("Failed to open pidfile: "), "got: {}", err.report());

        let err = DaemonError::from(LockError::AlreadyRunning {
            path: PathBuf::from("/run/librecastd.pid"),
            pid: Some(42),
        });
        assert_eq!(err.exit_code(), 5);
        assert_eq!(err.raw_os_error(), None);
        assert!(err.to_string().contains("pid 42"));
    }
}
