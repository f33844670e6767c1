use tokio::net::UdpSocket;

use librecast_core::ConfigStore;

use crate::error::NetError;
use crate::group::MulticastGroup;
use crate::socket::sender_socket;

/// One-shot publisher: the caller decides whether to retry a failed send.
#[derive(Debug)]
pub struct MulticastSender {
    socket: UdpSocket,
    destination: Option<MulticastGroup>,
}

impl MulticastSender {
    /// Resolve the group from `config` and open a sender socket.
    ///
    /// Must be called from within a tokio runtime. Every error returned here
    /// is fatal-class.
    pub fn init(config: &ConfigStore) -> Result<Self, NetError> {
        Self::for_group(MulticastGroup::resolve(config)?)
    }

    pub fn for_group(group: MulticastGroup) -> Result<Self, NetError> {
        let socket = sender_socket(&group)?;
        Ok(Self {
            socket,
            destination: Some(group),
        })
    }

    pub fn destination(&self) -> Option<&MulticastGroup> {
        self.destination.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.destination.is_some()
    }

    /// Send `message` plus a NUL terminator as a single datagram.
    ///
    /// A failed send releases the destination; subsequent sends return
    /// [`NetError::Released`] until a new sender is initialised.
    pub async fn send(&mut self, message: &str) -> Result<usize, NetError> {
        let Some(group) = self.destination else {
            return Err(NetError::Released);
        };
        let dest = group.socket_addr();

        let mut payload = Vec::with_capacity(message.len() + 1);
        payload.extend_from_slice(message.as_bytes());
        payload.push(0);

        tracing::debug!(dest = %dest, bytes = payload.len(), "sending datagram");
        match self.socket.send_to(&payload, dest).await {
            Ok(sent) => Ok(sent),
            Err(source) => {
                tracing::error!(dest = %dest, error = %source, "error sending data");
                self.free();
                Err(NetError::Send { dest, source })
            }
        }
    }

    /// Release the destination. Repeated calls are harmless.
    pub fn free(&mut self) {
        if let Some(group) = self.destination.take() {
            tracing::debug!(group = %group, "released multicast destination");
        }
    }
}
