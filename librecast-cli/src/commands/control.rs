//! `librecast stop|reload`: read the daemon pid from the lock file and signal it.

use colored::Colorize;

use librecast_core::{describe, paths};
use librecast_daemon::{dispatch, ControlCommand, ControlError, Delivered, LockFile};

/// Print the outcome of `verb`. Never fails; every result is a message.
pub fn run(verb: &str) {
    println!("{}", outcome(verb));
}

fn outcome(verb: &str) -> String {
    match send(verb) {
        Ok(Delivered { command, pid }) => format!("{command} sent to pid {pid}").green().to_string(),
        Err(err) if err.is_benign() => describe(err.code(), None).yellow().to_string(),
        Err(err) => describe(err.code(), err.io_error()).red().to_string(),
    }
}

fn send(verb: &str) -> Result<Delivered, ControlError> {
    let command = verb.parse::<ControlCommand>()?;
    let lock = LockFile::open(paths::default_lock_path())?;
    dispatch(command, &lock)
}
