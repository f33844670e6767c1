//! librecastd runtime: single-instance lock, signal-driven control plane and
//! the multicast receive loop.

pub mod control;
mod error;
pub mod lock;
pub mod logging;
mod runtime;

pub use control::{deliver, dispatch, ControlCommand, Delivered};
pub use error::{ControlError, DaemonError, LockError};
pub use lock::{LockFile, LockGuard};
pub use runtime::{load_config, print_config, run, send_once, start_blocking, DaemonOptions};
