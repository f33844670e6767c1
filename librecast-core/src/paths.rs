use std::path::PathBuf;

pub const PROGRAM_NAME: &str = "librecastd";
pub const LOCK_FILE: &str = "librecastd.pid";

/// True when running with effective uid 0.
#[cfg(unix)]
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// `/etc/librecastd.conf` for root, `$HOME/.librecastd.conf` otherwise.
pub fn default_config_path() -> PathBuf {
    if is_root() {
        PathBuf::from(format!("/etc/{PROGRAM_NAME}.conf"))
    } else {
        home().join(format!(".{PROGRAM_NAME}.conf"))
    }
}

/// Lock file location, derived from the daemon's identity:
/// `$XDG_RUNTIME_DIR/librecastd.pid`, else `/var/run/librecastd.pid` for
/// root, else `$HOME/.librecastd.pid`.
pub fn default_lock_path() -> PathBuf {
    if let Some(runtime) = dirs::runtime_dir() {
        return runtime.join(LOCK_FILE);
    }
    if is_root() {
        PathBuf::from("/var/run").join(LOCK_FILE)
    } else {
        home().join(format!(".{LOCK_FILE}"))
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
