//! End-to-end checks against the `librecastd` binary.
//!
//! Every run gets its own HOME and XDG_RUNTIME_DIR so the lock file lands in
//! a temp dir. Tests that need a live multicast group probe first and skip
//! on hosts without IPv6 multicast.
#![cfg(target_os = "linux")]

use std::fs;
use std::io::Read;
use std::net::{Ipv6Addr, UdpSocket as StdUdpSocket};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use librecast_daemon::{deliver, lock::parse_pid, ControlCommand, LockGuard};

fn librecastd(runtime: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("librecastd"));
    cmd.env("HOME", runtime)
        .env("XDG_RUNTIME_DIR", runtime)
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("librecastd.conf");
    fs::write(&path, body).expect("write config");
    path
}

fn free_port() -> u16 {
    StdUdpSocket::bind("[::]:0")
        .and_then(|s| s.local_addr())
        .map(|addr| addr.port())
        .expect("ephemeral port")
}

fn ipv6_multicast_available(port: u16) -> bool {
    let group: Ipv6Addr = "ff02::1".parse().unwrap();
    let Ok(socket) = StdUdpSocket::bind("[::]:0") else {
        return false;
    };
    if socket.join_multicast_v6(&group, 0).is_err() {
        return false;
    }
    socket.send_to(b"probe\0", (group, port)).is_ok()
}

// ---------------------------------------------------------------------------
// Config surface
// ---------------------------------------------------------------------------

#[test]
fn print_config_lists_defaults_and_file_values() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "# comment\ncastport 5000\ndebug yes\n");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .arg("--print-config")
        .assert()
        .success()
        .stdout(contains("castaddr ff02::1"))
        .stdout(contains("castport 5000"))
        .stdout(contains("debug 1"))
        .stdout(contains("loglevel 7"))
        .stdout(contains(format!("configfile {}", config.display())));
}

#[test]
fn print_config_json_carries_types() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "castaddr ff05::4242\n");

    let output = librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["--print-config", "--json"])
        .output()
        .expect("run librecastd");
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let castaddr = entries
        .as_array()
        .expect("array")
        .iter()
        .find(|e| e["key"] == "castaddr")
        .expect("castaddr entry");
    assert_eq!(castaddr["value"], "ff05::4242");
    assert_eq!(castaddr["type"], "string");
}

#[test]
fn loglevel_flag_overrides_file() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "loglevel 3\n");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["-l", "15", "--print-config"])
        .assert()
        .success()
        .stdout(contains("loglevel 15"));
}

#[test]
fn unknown_key_in_config_exits_with_config_invalid() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "castport 4242\nnosuchkey 1\n");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .arg("--print-config")
        .assert()
        .code(12)
        .stderr(contains("line 2"));
}

#[test]
fn out_of_bounds_value_exits_with_bounds_code() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "castport 70000\n");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .arg("--print-config")
        .assert()
        .code(9);
}

#[test]
fn missing_explicit_config_exits_with_read_fail() {
    let dir = TempDir::new().expect("tempdir");

    librecastd(dir.path())
        .arg("-c")
        .arg(dir.path().join("absent.conf"))
        .assert()
        .code(11)
        .stderr(contains("Unable to read config file"));
}

// ---------------------------------------------------------------------------
// Startup failures
// ---------------------------------------------------------------------------

#[test]
fn held_lock_exits_with_already_running() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "");
    let _held = LockGuard::acquire(dir.path().join("librecastd.pid")).expect("hold lock");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .assert()
        .code(5)
        .stderr(contains("already running"));
}

#[test]
fn hostname_group_exits_with_config_invalid() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "castaddr localhost\n");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .assert()
        .code(12);
}

#[test]
fn send_to_hostname_fails_without_lookup() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), "castaddr ip6-allnodes\n");

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["--send", "hello"])
        .assert()
        .code(12);
}

// ---------------------------------------------------------------------------
// Running daemon
// ---------------------------------------------------------------------------

struct Daemon {
    child: Child,
    lock_path: PathBuf,
}

impl Daemon {
    fn start(dir: &Path, config: &Path) -> Self {
        let child = librecastd(dir)
            .arg("-c")
            .arg(config)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn librecastd");
        let daemon = Self {
            child,
            lock_path: dir.join("librecastd.pid"),
        };
        daemon.wait_for_lock();
        daemon
    }

    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn wait_for_lock(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let recorded = fs::read_to_string(&self.lock_path)
                .ok()
                .and_then(|content| parse_pid(&content));
            if recorded == Some(self.pid()) {
                // Lock is taken before the group is joined.
                sleep(Duration::from_millis(200));
                return;
            }
            sleep(Duration::from_millis(25));
        }
        panic!("daemon did not record its pid in {}", self.lock_path.display());
    }

    fn wait_for_exit(&mut self, within: Duration) -> Option<std::process::ExitStatus> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Some(status);
            }
            sleep(Duration::from_millis(25));
        }
        None
    }

    fn stdout(&mut self) -> String {
        let mut out = String::new();
        if let Some(mut stdout) = self.child.stdout.take() {
            let _ = stdout.read_to_string(&mut out);
        }
        out
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn stop_signal_shuts_down_cleanly() {
    let port = free_port();
    if !ipv6_multicast_available(port) {
        eprintln!("skipping: IPv6 multicast unavailable on this host");
        return;
    }
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), &format!("castport {port}\n"));
    let mut daemon = Daemon::start(dir.path(), &config);

    deliver(ControlCommand::Stop, daemon.pid()).expect("deliver stop");

    let status = daemon
        .wait_for_exit(Duration::from_secs(5))
        .expect("daemon exits after stop");
    assert!(status.success(), "status: {status:?}");

    // Lock released: a new holder can take it.
    LockGuard::acquire(dir.path().join("librecastd.pid")).expect("lock free after stop");
}

#[test]
fn reload_keeps_daemon_running() {
    let port = free_port();
    if !ipv6_multicast_available(port) {
        eprintln!("skipping: IPv6 multicast unavailable on this host");
        return;
    }
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), &format!("castport {port}\n"));
    let mut daemon = Daemon::start(dir.path(), &config);

    // A broken file on reload is logged, not fatal.
    fs::write(&config, format!("castport {port}\nbogus line here\n")).expect("rewrite config");
    deliver(ControlCommand::Reload, daemon.pid()).expect("deliver reload");

    assert!(
        daemon.wait_for_exit(Duration::from_millis(500)).is_none(),
        "daemon exited after reload"
    );

    deliver(ControlCommand::Stop, daemon.pid()).expect("deliver stop");
    let status = daemon
        .wait_for_exit(Duration::from_secs(5))
        .expect("daemon exits after stop");
    assert!(status.success(), "status: {status:?}");
}

#[test]
fn received_datagrams_are_printed_with_timestamp() {
    let port = free_port();
    if !ipv6_multicast_available(port) {
        eprintln!("skipping: IPv6 multicast unavailable on this host");
        return;
    }
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), &format!("castport {port}\n"));
    let mut daemon = Daemon::start(dir.path(), &config);

    librecastd(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["--send", "hello"])
        .assert()
        .success();
    sleep(Duration::from_millis(300));

    deliver(ControlCommand::Stop, daemon.pid()).expect("deliver stop");
    daemon
        .wait_for_exit(Duration::from_secs(5))
        .expect("daemon exits after stop");

    let out = daemon.stdout();
    let line = out
        .lines()
        .find(|line| line.ends_with(" : hello"))
        .unwrap_or_else(|| panic!("no hello line in {out:?}"));
    // "%a %b %e %H:%M:%S %Y : hello"
    assert!(line.len() > " : hello".len() + 20, "got: {line}");
}
