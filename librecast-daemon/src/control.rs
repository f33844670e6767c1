//! Two-verb control plane: `stop` and `reload`, delivered as signals to the
//! pid recorded in the lock file. Fire-and-forget; nothing is acknowledged.

use std::fmt;
use std::str::FromStr;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::error::ControlError;
use crate::lock::LockFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// SIGINT: the daemon shuts down.
    Stop,
    /// SIGHUP: the daemon re-reads its config file.
    Reload,
}

impl ControlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Stop => "stop",
            ControlCommand::Reload => "reload",
        }
    }

    #[cfg(unix)]
    pub fn signal(self) -> Signal {
        match self {
            ControlCommand::Stop => Signal::SIGINT,
            ControlCommand::Reload => Signal::SIGHUP,
        }
    }
}

impl FromStr for ControlCommand {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(ControlCommand::Stop),
            "reload" => Ok(ControlCommand::Reload),
            other => Err(ControlError::InvalidCommand(other.to_string())),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification that was handed to the kernel. Says nothing about whether
/// the daemon acted on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub command: ControlCommand,
    pub pid: u32,
}

/// Read the daemon pid from `lock` and deliver `command` to it.
pub fn dispatch(command: ControlCommand, lock: &LockFile) -> Result<Delivered, ControlError> {
    let pid = lock.read_identity()?;
    deliver(command, pid)
}

/// Deliver `command` to `pid`. A pid that no longer exists is reported as
/// [`ControlError::DaemonStopped`].
#[cfg(unix)]
pub fn deliver(command: ControlCommand, pid: u32) -> Result<Delivered, ControlError> {
    let target = i32::try_from(pid).map_err(|_| ControlError::Signal {
        pid,
        source: std::io::Error::from(Errno::EINVAL),
    })?;

    tracing::debug!(pid, command = %command, "signalling daemon");
    match kill(Pid::from_raw(target), command.signal()) {
        Ok(()) => Ok(Delivered { command, pid }),
        Err(Errno::ESRCH) => Err(ControlError::DaemonStopped { pid }),
        Err(errno) => Err(ControlError::Signal {
            pid,
            source: std::io::Error::from(errno),
        }),
    }
}

#[cfg(not(unix))]
pub fn deliver(_command: ControlCommand, pid: u32) -> Result<Delivered, ControlError> {
    Err(ControlError::Signal {
        pid,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process signals are only supported on unix",
        ),
    })
}
