//! Error types for librecast-core.
//!
//! [`ErrorCode`] is the stable numeric taxonomy shared by every crate in the
//! workspace; the typed errors each map onto one of its values.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Stable, process-defined error codes. The numeric values are part of the
/// daemon's exit-status contract and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    PidOpen = 2,
    PidReadFail = 3,
    PidInvalid = 4,
    AlreadyRunning = 5,
    PidWriteFail = 6,
    DaemonFailure = 7,
    ConfigNotNumeric = 8,
    ConfigBounds = 9,
    ConfigBoolean = 10,
    ConfigReadFail = 11,
    ConfigInvalid = 12,
    Malloc = 13,
    InvalidArgs = 14,
    DaemonStopped = 15,
    NetSend = 16,
    NetRecv = 17,
    NetSockopt = 18,
    CmdInvalid = 19,
    SocketCreate = 20,
    SocketConnect = 21,
}

impl ErrorCode {
    /// Numeric value, used as the daemon's exit status on fatal paths.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::Failure => "Failure",
            ErrorCode::PidOpen => "Failed to open pidfile",
            ErrorCode::PidReadFail => "Failed to read pidfile",
            ErrorCode::PidInvalid => "Invalid pid",
            ErrorCode::AlreadyRunning => "Daemon already running",
            ErrorCode::PidWriteFail => "Failed to write to pidfile",
            ErrorCode::DaemonFailure => "Failed to daemonize",
            ErrorCode::ConfigNotNumeric => "Numeric config value not numeric",
            ErrorCode::ConfigBounds => "Numeric config value out of bounds",
            ErrorCode::ConfigBoolean => "Invalid boolean config value",
            ErrorCode::ConfigReadFail => "Unable to read config file",
            ErrorCode::ConfigInvalid => "Error in config file",
            ErrorCode::Malloc => "Memory allocation error",
            ErrorCode::InvalidArgs => "Invalid command line options",
            ErrorCode::DaemonStopped => "Daemon not running",
            ErrorCode::NetSend => "Error sending data",
            ErrorCode::NetRecv => "Error receiving data",
            ErrorCode::NetSockopt => "Error setting socket options",
            ErrorCode::CmdInvalid => "Invalid Command received",
            ErrorCode::SocketCreate => "Unable to create unix socket",
            ErrorCode::SocketConnect => "Unable to connect to unix socket",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Combine a process-defined code with the platform error, if any, into one
/// line: `"<message> (os error N: <text>)"`.
pub fn describe(code: ErrorCode, os_error: Option<&std::io::Error>) -> String {
    match os_error {
        Some(err) => match err.raw_os_error() {
            Some(errno) => format!("{code} (os error {errno}: {})", strip_os_suffix(err)),
            None => format!("{code} ({err})"),
        },
        None => code.message().to_string(),
    }
}

// `io::Error`'s Display already appends " (os error N)"; drop it so the
// errno is not printed twice.
fn strip_os_suffix(err: &std::io::Error) -> String {
    let text = err.to_string();
    match text.rfind(" (os error ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

/// All errors that can arise from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key is not in the compiled-in option table, or has the wrong type for
    /// the requested access.
    #[error("'{key}' not a valid configuration option")]
    Invalid { key: String },

    #[error("'{value}' not a boolean value for '{key}'")]
    Boolean { key: String, value: String },

    #[error("'{value}' not numeric for '{key}'")]
    NotNumeric { key: String, value: String },

    #[error("{value} out of bounds for '{key}' ({min}..={max})")]
    Bounds {
        key: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Numeric key read before it was ever set.
    #[error("'{key}' has no value")]
    Missing { key: String },

    #[error("unable to read config file {path}: {source}")]
    ReadFail {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file line was rejected; `line` is 1-based.
    #[error("error in line {line} of config file {path}: {source}")]
    Line {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("malformed config line: '{0}'")]
    Malformed(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Invalid { .. }
            | ConfigError::Missing { .. }
            | ConfigError::Malformed(_) => ErrorCode::ConfigInvalid,
            ConfigError::Boolean { .. } => ErrorCode::ConfigBoolean,
            ConfigError::NotNumeric { .. } => ErrorCode::ConfigNotNumeric,
            ConfigError::Bounds { .. } => ErrorCode::ConfigBounds,
            ConfigError::ReadFail { .. } => ErrorCode::ConfigReadFail,
            ConfigError::Line { source, .. } => source.code(),
        }
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ConfigError::ReadFail { source, .. } => source.raw_os_error(),
            ConfigError::Line { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
