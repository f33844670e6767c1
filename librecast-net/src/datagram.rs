use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Local};

/// Receive buffer size; longer datagrams are truncated by the kernel.
pub const RECV_BUFFER: usize = 1024;

/// One received payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub received_at: DateTime<Local>,
    pub source: SocketAddr,
    pub payload: String,
}

impl Datagram {
    /// Decode `bytes` as text up to the first NUL, replacing invalid UTF-8.
    pub fn from_bytes(bytes: &[u8], source: SocketAddr, received_at: DateTime<Local>) -> Self {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Self {
            received_at,
            source,
            payload: String::from_utf8_lossy(&bytes[..end]).into_owned(),
        }
    }
}

/// `ctime`-style timestamp, then the payload:
/// `Sat Oct 17 09:05:00 2026 : hello`.
impl fmt::Display for Datagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {}",
            self.received_at.format("%a %b %e %H:%M:%S %Y"),
            self.payload
        )
    }
}
