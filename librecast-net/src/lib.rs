//! Multicast transport: group resolution, sender and listener sockets, and
//! the receive loop.
//!
//! Setup and receive failures are fatal ([`NetError::is_fatal`]); only a
//! failed [`MulticastSender::send`] is recoverable.

mod datagram;
mod error;
mod group;
mod listener;
mod sender;
mod socket;

pub use datagram::{Datagram, RECV_BUFFER};
pub use error::NetError;
pub use group::{MulticastGroup, MULTICAST_HOPS};
pub use listener::MulticastListener;
pub use sender::MulticastSender;
