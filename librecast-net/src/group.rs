use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use librecast_core::{keys, ConfigError, ConfigStore};

use crate::error::NetError;

/// Multicast hop limit (IPv6) / TTL (IPv4): the local subnet only.
pub const MULTICAST_HOPS: u32 = 1;

/// A resolved multicast destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastGroup {
    pub address: IpAddr,
    pub port: u16,
    pub hops: u32,
    /// Deliver our own datagrams back to local listeners. Handy for testing
    /// on one host; production deployments may want it off.
    pub loopback: bool,
}

impl MulticastGroup {
    /// Resolve `castaddr`/`castport` from the store.
    pub fn resolve(config: &ConfigStore) -> Result<Self, NetError> {
        let address = config.get(keys::CASTADDR).ok_or_else(|| ConfigError::Missing {
            key: keys::CASTADDR.to_string(),
        })?;
        let port = config.get(keys::CASTPORT).ok_or_else(|| ConfigError::Missing {
            key: keys::CASTPORT.to_string(),
        })?;
        Self::parse(&address, &port)
    }

    /// Numeric-only resolution: no name service is ever consulted.
    pub fn parse(address: &str, port: &str) -> Result<Self, NetError> {
        tracing::debug!(address, port, "resolving multicast address");
        let resolve_err = || NetError::Resolve {
            address: address.to_string(),
            port: port.to_string(),
        };

        let ip = address.trim().parse::<IpAddr>().map_err(|_| resolve_err())?;
        let port = port.trim().parse::<u16>().map_err(|_| resolve_err())?;
        if !ip.is_multicast() {
            return Err(NetError::NotMulticast { address: ip });
        }

        Ok(Self {
            address: ip,
            port,
            hops: MULTICAST_HOPS,
            loopback: true,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Wildcard local address in the group's family, on the group port.
    pub fn wildcard(&self) -> SocketAddr {
        SocketAddr::new(self.unspecified(), self.port)
    }

    /// Wildcard local address with an ephemeral port, for senders.
    pub fn ephemeral(&self) -> SocketAddr {
        SocketAddr::new(self.unspecified(), 0)
    }

    fn unspecified(&self) -> IpAddr {
        match self.address {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for MulticastGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.socket_addr().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_ipv6_group() {
        let group = MulticastGroup::parse("ff02::1", "4242").unwrap();
        assert_eq!(group.address, "ff02::1".parse::<IpAddr>().unwrap());
        assert_eq!(group.port, 4242);
        assert_eq!(group.hops, 1);
        assert!(group.loopback);
        assert_eq!(group.to_string(), "[ff02::1]:4242");
        assert_eq!(group.wildcard().to_string(), "[::]:4242");
        assert_eq!(group.ephemeral().port(), 0);
    }

    #[test]
    fn parses_ipv4_group_in_its_own_family() {
        let group = MulticastGroup::parse("239.1.2.3", "5000").unwrap();
        assert_eq!(group.wildcard().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn hostnames_fail_without_lookup() {
        for address in ["localhost", "ip6-allnodes", "example.com"] {
            let err = MulticastGroup::parse(address, "4242").unwrap_err();
            assert!(matches!(err, NetError::Resolve { .. }), "{address}: {err}");
        }
    }

    #[test]
    fn service_names_and_bad_ports_fail() {
        for port in ["http", "70000", "", "-1"] {
            let err = MulticastGroup::parse("ff02::1", port).unwrap_err();
            assert!(matches!(err, NetError::Resolve { .. }), "{port}: {err}");
        }
    }

    #[test]
    fn unicast_addresses_are_rejected() {
        let err = MulticastGroup::parse("::1", "4242").unwrap_err();
        assert!(matches!(err, NetError::NotMulticast { .. }), "got: {err}");
    }

    #[test]
    fn resolve_reads_store_values() {
        let store = ConfigStore::with_config_file("/nonexistent.conf");
        store.set(keys::CASTADDR, "ff3e::42").unwrap();
        store.set_num(keys::CASTPORT, 9999).unwrap();
        let group = MulticastGroup::resolve(&store).unwrap();
        assert_eq!(group.to_string(), "[ff3e::42]:9999");
    }

    #[test]
    fn resolve_without_address_is_config_error() {
        let store = ConfigStore::with_config_file("/nonexistent.conf");
        store.unset(keys::CASTADDR);
        let err = MulticastGroup::resolve(&store).unwrap_err();
        assert!(matches!(err, NetError::Config(ConfigError::Missing { .. })));
    }
}
