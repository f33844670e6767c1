//! Datagram socket construction shared by sender and listener.
//!
//! Options are applied on a `socket2` socket, which is then handed to tokio.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;

use crate::error::NetError;
use crate::group::MulticastGroup;

fn datagram_socket(local: SocketAddr) -> Result<Socket, NetError> {
    Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))
        .map_err(|source| NetError::Socket { source })
}

/// Unbound-equivalent sender socket: ephemeral port, hop limit and loopback
/// taken from `group`.
pub(crate) fn sender_socket(group: &MulticastGroup) -> Result<UdpSocket, NetError> {
    tracing::debug!(group = %group, "creating datagram socket");
    let local = group.ephemeral();
    let socket = datagram_socket(local)?;
    socket
        .bind(&SockAddr::from(local))
        .map_err(|source| NetError::Socket { source })?;

    tracing::debug!(hops = group.hops, "setting multicast hop limit");
    tracing::debug!(loopback = group.loopback, "setting multicast loopback");
    match group.address {
        IpAddr::V6(_) => {
            socket
                .set_multicast_hops_v6(group.hops)
                .map_err(|source| NetError::SockOpt {
                    option: "IPV6_MULTICAST_HOPS",
                    source,
                })?;
            socket
                .set_multicast_loop_v6(group.loopback)
                .map_err(|source| NetError::SockOpt {
                    option: "IPV6_MULTICAST_LOOP",
                    source,
                })?;
        }
        IpAddr::V4(_) => {
            socket
                .set_multicast_ttl_v4(group.hops)
                .map_err(|source| NetError::SockOpt {
                    option: "IP_MULTICAST_TTL",
                    source,
                })?;
            socket
                .set_multicast_loop_v4(group.loopback)
                .map_err(|source| NetError::SockOpt {
                    option: "IP_MULTICAST_LOOP",
                    source,
                })?;
        }
    }

    into_tokio(socket)
}

/// Socket bound to the wildcard address on the group port and joined to the
/// group on the default interface.
pub(crate) fn listener_socket(group: &MulticastGroup) -> Result<UdpSocket, NetError> {
    let local = group.wildcard();
    tracing::debug!(local = %local, "binding multicast listener");
    let socket = datagram_socket(local)?;
    socket
        .bind(&SockAddr::from(local))
        .map_err(|source| NetError::Bind {
            addr: local,
            source,
        })?;

    let socket = into_tokio(socket)?;
    join_group(&socket, group)?;
    tracing::info!(group = %group, "joined multicast group");
    Ok(socket)
}

// Interface 0 / INADDR_ANY: let the kernel pick the default interface.
pub(crate) fn join_group(socket: &UdpSocket, group: &MulticastGroup) -> Result<(), NetError> {
    let joined = match group.address {
        IpAddr::V6(addr) => socket.join_multicast_v6(&addr, 0),
        IpAddr::V4(addr) => socket.join_multicast_v4(addr, Ipv4Addr::UNSPECIFIED),
    };
    joined.map_err(|source| NetError::Join {
        group: group.address,
        source,
    })
}

pub(crate) fn leave_group(socket: &UdpSocket, group: &MulticastGroup) -> std::io::Result<()> {
    match group.address {
        IpAddr::V6(addr) => socket.leave_multicast_v6(&addr, 0),
        IpAddr::V4(addr) => socket.leave_multicast_v4(addr, Ipv4Addr::UNSPECIFIED),
    }
}

fn into_tokio(socket: Socket) -> Result<UdpSocket, NetError> {
    socket
        .set_nonblocking(true)
        .map_err(|source| NetError::SockOpt {
            option: "O_NONBLOCK",
            source,
        })?;
    UdpSocket::from_std(std::net::UdpSocket::from(socket))
        .map_err(|source| NetError::Socket { source })
}
