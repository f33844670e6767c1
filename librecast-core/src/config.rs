//! Typed, validated configuration store.
//!
//! # Model
//!
//! The store is an insertion-ordered list of `key value` entries behind a
//! single mutex. Every key must appear in the compiled-in [`OPTIONS`] table,
//! which fixes its type; integer keys are further bounded by [`LIMITS`].
//! Values are validated before the lock is taken and committed by updating
//! the existing entry in place, so a key never appears twice.
//!
//! # Config file
//!
//! ```text
//! # comment
//! castaddr ff02::1      (string value)
//! castport 4242         (numeric value)
//! ```
//!
//! Any other non-blank, non-comment line aborts reading with an error that
//! names its 1-based line number.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::error::ConfigError;
use crate::paths::default_config_path;

/// Well-known option names.
pub mod keys {
    pub const CASTADDR: &str = "castaddr";
    pub const CASTPORT: &str = "castport";
    pub const CONFIGFILE: &str = "configfile";
    pub const DEBUG: &str = "debug";
    pub const LOGLEVEL: &str = "loglevel";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Bool,
    Int,
    String,
}

impl ConfigType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ConfigType::Bool | ConfigType::Int)
    }
}

/// One row of the compiled-in option table.
#[derive(Debug, Clone, Copy)]
pub struct ConfigOption {
    pub key: &'static str,
    pub kind: ConfigType,
    /// `None` means the default is computed when the store is built
    /// (only `configfile`, whose path depends on the running identity).
    pub default: Option<&'static str>,
    pub description: &'static str,
}

pub const OPTIONS: &[ConfigOption] = &[
    ConfigOption {
        key: keys::CASTADDR,
        kind: ConfigType::String,
        default: Some("ff02::1"),
        description: "multicast group address (numeric)",
    },
    ConfigOption {
        key: keys::CASTPORT,
        kind: ConfigType::Int,
        default: Some("4242"),
        description: "multicast port",
    },
    ConfigOption {
        key: keys::CONFIGFILE,
        kind: ConfigType::String,
        default: None,
        description: "path to config file",
    },
    ConfigOption {
        key: keys::DEBUG,
        kind: ConfigType::Bool,
        default: Some("0"),
        description: "force debug logging",
    },
    ConfigOption {
        key: keys::LOGLEVEL,
        kind: ConfigType::Int,
        default: Some("7"),
        description: "log verbosity bitmask",
    },
];

/// Inclusive `(key, min, max)` bounds for integer options.
pub const LIMITS: &[(&str, i64, i64)] = &[(keys::CASTPORT, 1, 65535), (keys::LOGLEVEL, 0, 31)];

const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];
const FALSY: [&str; 4] = ["0", "false", "no", "off"];

/// Declared type of `key`, or `None` if it is not a valid option.
pub fn config_type(key: &str) -> Option<ConfigType> {
    OPTIONS.iter().find(|opt| opt.key == key).map(|opt| opt.kind)
}

/// Inclusive bounds for `key`; unbounded keys span the whole `i64` range.
pub fn bounds(key: &str) -> (i64, i64) {
    LIMITS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, min, max)| (*min, *max))
        .unwrap_or((i64::MIN, i64::MAX))
}

/// Map the boolean vocabulary onto `1`/`0`. Case-sensitive.
pub fn parse_bool(value: &str) -> Option<i64> {
    if TRUTHY.contains(&value) {
        Some(1)
    } else if FALSY.contains(&value) {
        Some(0)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ConfigType,
}

/// Process configuration. Construct one per process and share it by
/// reference (or `Arc`) with the components that need it.
#[derive(Debug)]
pub struct ConfigStore {
    entries: Mutex<Vec<ConfigEntry>>,
    default_config: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ConfigStore {
    /// Empty store; `configfile` will default to `default_config` once
    /// [`defaults`](Self::defaults) runs.
    pub fn new(default_config: impl Into<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            default_config: default_config.into(),
        }
    }

    /// Store populated with the compiled-in defaults and the identity-derived
    /// config path.
    pub fn with_defaults() -> Self {
        Self::with_config_file(default_config_path())
    }

    /// Store populated with the compiled-in defaults, `configfile` pointing at
    /// `path`.
    pub fn with_config_file(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        store.defaults();
        store
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConfigEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Populate (or overwrite) every option with its compiled-in default.
    pub fn defaults(&self) {
        tracing::debug!("setting config defaults");
        for opt in OPTIONS {
            let value = match opt.default {
                Some(value) => value.to_string(),
                None => self.default_config.display().to_string(),
            };
            let result = self.set(opt.key, &value);
            debug_assert!(
                result.is_ok(),
                "compiled-in default for '{}' rejected: {result:?}",
                opt.key
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock()
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.clone())
    }

    /// Numeric value of a bool or int option.
    ///
    /// An unset `loglevel` reads as 0 so logging can be configured before
    /// defaults exist; any other unset key is [`ConfigError::Missing`].
    pub fn get_num(&self, key: &str) -> Result<i64, ConfigError> {
        match config_type(key) {
            Some(kind) if kind.is_numeric() => {}
            _ => return Err(ConfigError::Invalid { key: key.to_string() }),
        }

        let Some(value) = self.get(key) else {
            if key == keys::LOGLEVEL {
                return Ok(0);
            }
            return Err(ConfigError::Missing { key: key.to_string() });
        };

        value.parse::<i64>().map_err(|_| ConfigError::NotNumeric {
            key: key.to_string(),
            value,
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.get_num(key)? != 0)
    }

    /// Validate `value` against the option table, then commit it.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        tracing::debug!(key, value, "config set");

        let Some(kind) = config_type(key) else {
            tracing::error!(key, "not a valid configuration option");
            return Err(ConfigError::Invalid { key: key.to_string() });
        };

        let stored = match kind {
            ConfigType::Bool => match parse_bool(value) {
                Some(n) => n.to_string(),
                None => {
                    tracing::error!(key, value, "not a boolean value");
                    return Err(ConfigError::Boolean {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
            },
            ConfigType::Int => {
                let n = value.parse::<i64>().map_err(|_| ConfigError::NotNumeric {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                let (min, max) = bounds(key);
                if n < min || n > max {
                    return Err(ConfigError::Bounds {
                        key: key.to_string(),
                        value: n,
                        min,
                        max,
                    });
                }
                n.to_string()
            }
            ConfigType::String => value.to_string(),
        };

        let mut entries = self.lock();
        match entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = stored,
            None => entries.push(ConfigEntry {
                key: key.to_string(),
                value: stored,
                kind,
            }),
        }
        Ok(())
    }

    pub fn set_num(&self, key: &str, value: i64) -> Result<(), ConfigError> {
        self.set(key, &value.to_string())
    }

    /// Remove every entry for `key` and return how many were removed.
    pub fn unset(&self, key: &str) -> usize {
        let removed = {
            let mut entries = self.lock();
            let before = entries.len();
            entries.retain(|entry| entry.key != key);
            before - entries.len()
        };
        tracing::debug!(key, removed, "config unset");
        removed
    }

    /// Drop every entry and repopulate the compiled-in defaults.
    pub fn reset(&self) {
        self.lock().clear();
        self.defaults();
    }

    /// Re-read the config file over fresh defaults.
    ///
    /// The current `configfile` survives the reset. This is not atomic: if
    /// reading fails the store holds the defaults plus whatever lines were
    /// applied before the failure.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let configfile = self.get(keys::CONFIGFILE);
        self.reset();
        let Some(configfile) = configfile else {
            return Ok(());
        };
        self.set(keys::CONFIGFILE, &configfile)?;
        self.read_file(Path::new(&configfile))
    }

    /// Apply every line of the file at `path`, stopping at the first error.
    pub fn read_file(&self, path: &Path) -> Result<(), ConfigError> {
        tracing::info!(path = %path.display(), "reading config file");

        let contents = std::fs::read_to_string(path).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "unable to read config file");
            ConfigError::ReadFail {
                path: path.to_path_buf(),
                source,
            }
        })?;

        for (idx, line) in contents.lines().enumerate() {
            if let Err(err) = self.apply_line(line) {
                tracing::error!(line = idx + 1, error = %err, "error in config file");
                return Err(ConfigError::Line {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source: Box::new(err),
                });
            }
        }
        Ok(())
    }

    /// Apply one config file line.
    pub fn apply_line(&self, line: &str) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let Some((key, rest)) = line.split_once(char::is_whitespace) else {
            return Err(ConfigError::Malformed(line.to_string()));
        };
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(ConfigError::Malformed(line.to_string()));
        }

        match rest.parse::<i64>() {
            Ok(n) => self.set_num(key, n),
            Err(_) => self.set(key, rest),
        }
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
