//! Error types for librecast-net.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use librecast_core::{ConfigError, ErrorCode};

/// All errors that can arise from the multicast transport.
///
/// Everything except [`NetError::Send`] and [`NetError::Released`] is fatal:
/// a daemon without a working socket has nothing left to do.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Address or port is not numeric. Hostnames are never looked up.
    #[error("cannot resolve '{address}' port '{port}': numeric address and port required")]
    Resolve { address: String, port: String },

    #[error("{address} is not a multicast address")]
    NotMulticast { address: IpAddr },

    #[error("unable to create datagram socket: {source}")]
    Socket {
        #[source]
        source: std::io::Error,
    },

    #[error("unable to set {option}: {source}")]
    SockOpt {
        option: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to join multicast group {group}: {source}")]
    Join {
        group: IpAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("error receiving data: {source}")]
    Recv {
        #[source]
        source: std::io::Error,
    },

    #[error("error sending data to {dest}: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The destination was freed, either explicitly or by a failed send.
    #[error("multicast destination released; sender must be re-initialised")]
    Released,
}

impl NetError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NetError::Config(err) => err.code(),
            NetError::Resolve { .. } | NetError::NotMulticast { .. } => ErrorCode::ConfigInvalid,
            NetError::Socket { .. } | NetError::Bind { .. } => ErrorCode::Failure,
            NetError::SockOpt { .. } | NetError::Join { .. } => ErrorCode::NetSockopt,
            NetError::Recv { .. } => ErrorCode::NetRecv,
            NetError::Send { .. } | NetError::Released => ErrorCode::NetSend,
        }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, NetError::Send { .. } | NetError::Released)
    }

    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            NetError::Socket { source }
            | NetError::SockOpt { source, .. }
            | NetError::Bind { source, .. }
            | NetError::Join { source, .. }
            | NetError::Recv { source }
            | NetError::Send { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            NetError::Config(err) => err.raw_os_error(),
            other => other.io_error().and_then(std::io::Error::raw_os_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_send_failures_are_recoverable() {
        let send = NetError::Send {
            dest: "[ff02::1]:4242".parse().unwrap(),
            source: std::io::Error::from_raw_os_error(101),
        };
        assert!(!send.is_fatal());
        assert_eq!(send.code(), ErrorCode::NetSend);
        assert_eq!(send.raw_os_error(), Some(101));
        assert!(!NetError::Released.is_fatal());

        let recv = NetError::Recv {
            source: std::io::Error::from_raw_os_error(9),
        };
        assert!(recv.is_fatal());
        assert_eq!(recv.code(), ErrorCode::NetRecv);

        let resolve = NetError::Resolve {
            address: "localhost".into(),
            port: "4242".into(),
        };
        assert!(resolve.is_fatal());
        assert_eq!(resolve.code(), ErrorCode::ConfigInvalid);
    }
}
