//! Tracing setup driven by the `loglevel` and `debug` options.
//!
//! `loglevel` is a bitmask; the most verbose bit set decides the filter.
//! `RUST_LOG`, when present, overrides the config entirely.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use librecast_core::{keys, ConfigStore};

pub const LOG_ERROR: i64 = 1;
pub const LOG_WARN: i64 = 2;
pub const LOG_INFO: i64 = 4;
pub const LOG_DEBUG: i64 = 8;
pub const LOG_TRACE: i64 = 16;

/// Most verbose level enabled by `loglevel`, raised to at least DEBUG when
/// `debug` is set.
pub fn level_filter(loglevel: i64, debug: bool) -> LevelFilter {
    let level = if loglevel & LOG_TRACE != 0 {
        LevelFilter::TRACE
    } else if loglevel & LOG_DEBUG != 0 {
        LevelFilter::DEBUG
    } else if loglevel & LOG_INFO != 0 {
        LevelFilter::INFO
    } else if loglevel & LOG_WARN != 0 {
        LevelFilter::WARN
    } else if loglevel & LOG_ERROR != 0 {
        LevelFilter::ERROR
    } else {
        LevelFilter::OFF
    };

    match (debug, level) {
        (true, LevelFilter::TRACE) => LevelFilter::TRACE,
        (true, _) => LevelFilter::DEBUG,
        (false, level) => level,
    }
}

/// Filter derived from the store's `loglevel` and `debug` entries.
pub fn config_filter(config: &ConfigStore) -> EnvFilter {
    let loglevel = config.get_num(keys::LOGLEVEL).unwrap_or(0);
    let debug = config.get_bool(keys::DEBUG).unwrap_or(false);
    EnvFilter::default().add_directive(level_filter(loglevel, debug).into())
}

/// Handle for swapping the active filter after a config reload.
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogHandle {
    /// Re-derive the filter from `config`. No-op when `RUST_LOG` is in charge.
    pub fn apply(&self, config: &ConfigStore) {
        if self.env_override {
            return;
        }
        if let Err(err) = self.handle.reload(config_filter(config)) {
            tracing::warn!(error = %err, "failed to update log filter");
        }
    }
}

/// Install the global subscriber. Writes to stderr so stdout stays free for
/// received datagrams.
pub fn init_tracing(config: &ConfigStore, json: bool) -> LogHandle {
    let (filter, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (config_filter(config), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let plain = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let structured = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .try_init();

    LogHandle {
        handle,
        env_override,
    }
}
