use std::convert::Infallible;

use chrono::Local;
use tokio::net::UdpSocket;

use librecast_core::ConfigStore;

use crate::datagram::{Datagram, RECV_BUFFER};
use crate::error::NetError;
use crate::group::MulticastGroup;
use crate::socket::{join_group, leave_group, listener_socket};

/// A socket bound to the group port and joined to the group.
#[derive(Debug)]
pub struct MulticastListener {
    socket: UdpSocket,
    group: MulticastGroup,
}

impl MulticastListener {
    /// Resolve, bind and join. Must be called from within a tokio runtime.
    /// Every error returned here is fatal-class.
    pub fn bind(config: &ConfigStore) -> Result<Self, NetError> {
        Self::for_group(MulticastGroup::resolve(config)?)
    }

    pub fn for_group(group: MulticastGroup) -> Result<Self, NetError> {
        let socket = listener_socket(&group)?;
        Ok(Self { socket, group })
    }

    pub fn group(&self) -> &MulticastGroup {
        &self.group
    }

    /// Switch to `group`. Same family and port: join the new group on the
    /// existing socket and leave the old one. Otherwise bind a fresh socket;
    /// on failure the current one is kept.
    pub fn switch_to(&mut self, group: MulticastGroup) -> Result<(), NetError> {
        if group == self.group {
            return Ok(());
        }
        if group.wildcard() == self.group.wildcard() {
            join_group(&self.socket, &group)?;
            if let Err(err) = leave_group(&self.socket, &self.group) {
                tracing::warn!(group = %self.group, error = %err, "failed to leave group");
            }
        } else {
            self.socket = listener_socket(&group)?;
        }
        tracing::info!(from = %self.group, to = %group, "listener moved");
        self.group = group;
        Ok(())
    }

    /// Wait for the next datagram. Cancel-safe.
    pub async fn recv(&self) -> Result<Datagram, NetError> {
        let mut buf = [0u8; RECV_BUFFER];
        let (len, source) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|source| NetError::Recv { source })?;
        Ok(Datagram::from_bytes(&buf[..len], source, Local::now()))
    }

    /// Receive forever, one datagram at a time, handing each to `sink` in
    /// arrival order. Only returns on a (fatal) receive error.
    pub async fn listen<F>(&self, mut sink: F) -> Result<Infallible, NetError>
    where
        F: FnMut(&Datagram),
    {
        tracing::info!(group = %self.group, "listening");
        loop {
            let datagram = self.recv().await?;
            tracing::trace!(source = %datagram.source, bytes = datagram.payload.len(), "datagram received");
            sink(&datagram);
        }
    }
}
