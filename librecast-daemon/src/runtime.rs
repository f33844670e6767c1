use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};

use librecast_core::{keys, paths, ConfigError, ConfigStore};
use librecast_net::{Datagram, MulticastGroup, MulticastListener, MulticastSender};

use crate::error::{io_err, DaemonError};
use crate::lock::LockGuard;
use crate::logging::{init_tracing, LogHandle};

/// Command-line settings that sit above the config file.
#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    /// Explicit config file; a missing explicit file is fatal.
    pub config_path: Option<PathBuf>,
    pub lock_path: Option<PathBuf>,
    pub loglevel: Option<i64>,
    pub debug: bool,
    pub log_json: bool,
}

impl DaemonOptions {
    fn lock_path(&self) -> PathBuf {
        self.lock_path.clone().unwrap_or_else(paths::default_lock_path)
    }

    /// Re-apply flag overrides; run after every file read.
    fn apply_overrides(&self, config: &ConfigStore) -> Result<(), ConfigError> {
        if let Some(loglevel) = self.loglevel {
            config.set_num(keys::LOGLEVEL, loglevel)?;
        }
        if self.debug {
            config.set(keys::DEBUG, "1")?;
        }
        Ok(())
    }
}

/// Build the store: defaults, flag overrides, config file, overrides again.
///
/// Installs tracing along the way so file errors are logged at the
/// configured verbosity.
pub fn load_config(options: &DaemonOptions) -> Result<(ConfigStore, LogHandle), DaemonError> {
    let config = match &options.config_path {
        Some(path) => ConfigStore::with_config_file(path),
        None => ConfigStore::with_defaults(),
    };
    options.apply_overrides(&config)?;
    let log = init_tracing(&config, options.log_json);

    let path = PathBuf::from(config.get(keys::CONFIGFILE).unwrap_or_default());
    match config.read_file(&path) {
        Ok(()) => {}
        Err(ConfigError::ReadFail { source, .. })
            if options.config_path.is_none() && source.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::warn!(path = %path.display(), "no config file, using defaults");
        }
        Err(err) => return Err(err.into()),
    }

    options.apply_overrides(&config)?;
    log.apply(&config);
    Ok((config, log))
}

/// Start the daemon and block the current thread until it stops.
///
/// Fatal failures come back as errors after the listener, the lock and the
/// config store have been released, in that order.
pub fn start_blocking(options: &DaemonOptions) -> Result<(), DaemonError> {
    let (config, log) = load_config(options)?;
    let config = Arc::new(config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run(Arc::clone(&config), options.clone(), log));

    drop(config);
    if let Err(err) = &result {
        tracing::error!(
            code = err.code().as_i32(),
            os_error = err.raw_os_error(),
            error = %err,
            "daemon exiting",
        );
    }
    result
}

/// Run the daemon: acquire the lock, join the group and receive until a
/// stop signal arrives or the transport fails.
pub async fn run(
    config: Arc<ConfigStore>,
    options: DaemonOptions,
    log: LogHandle,
) -> Result<(), DaemonError> {
    let mut interrupt = signal(SignalKind::interrupt()).map_err(|e| io_err("SIGINT", e))?;
    let mut terminate = signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM", e))?;
    let mut hangup = signal(SignalKind::hangup()).map_err(|e| io_err("SIGHUP", e))?;

    let lock = LockGuard::acquire(options.lock_path())?;
    let mut listener = MulticastListener::bind(&config)?;
    tracing::info!(
        pid = lock.pid(),
        lock = %lock.path().display(),
        group = %listener.group(),
        "daemon started",
    );

    let mut sink = |datagram: &Datagram| {
        println!("{datagram}");
        tracing::debug!(source = %datagram.source, payload = %datagram.payload, "datagram");
    };

    let outcome = loop {
        tokio::select! {
            result = listener.listen(&mut sink) => match result {
                Ok(never) => match never {},
                Err(err) => break Err(err.into()),
            },
            _ = interrupt.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break Ok(());
            }
            _ = terminate.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break Ok(());
            }
            _ = hangup.recv() => {
                tracing::info!("received SIGHUP, reloading config");
                reload(&config, &options, &log);
                if let Err(err) = follow_group(&config, &mut listener) {
                    break Err(err);
                }
            }
        }
    };

    drop(listener);
    drop(lock);
    tracing::info!("daemon stopped");
    outcome
}

fn reload(config: &ConfigStore, options: &DaemonOptions, log: &LogHandle) {
    if let Err(err) = config.reload() {
        tracing::warn!(
            code = err.code().as_i32(),
            error = %err,
            "config reload failed; settings may be partially applied",
        );
    }
    if let Err(err) = options.apply_overrides(config) {
        tracing::warn!(error = %err, "failed to re-apply command line overrides");
    }
    log.apply(config);
}

/// Follow a group change after reload. An unresolvable group keeps the
/// current one; a group that resolves but cannot be joined is fatal.
fn follow_group(config: &ConfigStore, listener: &mut MulticastListener) -> Result<(), DaemonError> {
    let group = match MulticastGroup::resolve(config) {
        Ok(group) => group,
        Err(err) => {
            tracing::warn!(error = %err, group = %listener.group(), "keeping current group");
            return Ok(());
        }
    };
    if group != *listener.group() {
        listener.switch_to(group)?;
    }
    Ok(())
}

/// Publish one message and return. Used by `librecastd --send`.
pub fn send_once(options: &DaemonOptions, message: &str) -> Result<(), DaemonError> {
    let (config, _log) = load_config(options)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(async {
        let mut sender = MulticastSender::init(&config)?;
        let sent = sender.send(message).await?;
        tracing::info!(bytes = sent, group = ?sender.destination(), "message sent");
        sender.free();
        Ok(())
    })
}

/// Write the effective configuration to stdout.
pub fn print_config(options: &DaemonOptions, json: bool) -> Result<(), DaemonError> {
    let (config, _log) = load_config(options)?;
    let entries = config.entries();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in entries {
            println!("{} {}", entry.key, entry.value);
        }
    }
    Ok(())
}
