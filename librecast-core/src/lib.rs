//! librecast core library — configuration store, error taxonomy, paths.
//!
//! - [`config`] — [`ConfigStore`] and the compiled-in option table
//! - [`error`] — [`ErrorCode`], [`ConfigError`] and [`describe`]
//! - [`paths`] — identity-derived config and lock file locations

pub mod config;
pub mod error;
pub mod paths;

pub use config::{keys, ConfigEntry, ConfigStore, ConfigType};
pub use error::{describe, ConfigError, ErrorCode};
pub use paths::PROGRAM_NAME;
