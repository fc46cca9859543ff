//! Live network state reported for running guests.
//!
//! Virtual machines report through the QEMU guest agent
//! (`/nodes/{node}/qemu/{vmid}/agent/network-get-interfaces`), containers through
//! the node (`/nodes/{node}/lxc/{vmid}/interfaces`).

use serde::{Deserialize, Serialize};

use super::guest_config::{hwaddr_matches, split_cidr};

/// Envelope of the guest agent answer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentNetworkResponse {
    pub result: Vec<AgentInterface>,
}

/// A network interface as seen by the QEMU guest agent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentInterface {
    /// Interface name inside the guest (e.g. `eth0`, `ens18`).
    pub name: String,
    /// Hardware address; absent for loopback on some agents.
    #[serde(default)]
    pub hardware_address: Option<String>,
    #[serde(default)]
    pub ip_addresses: Vec<AgentIpAddress>,
}

/// One address bound to an agent-reported interface.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentIpAddress {
    pub ip_address: String,
    /// `ipv4` or `ipv6`.
    pub ip_address_type: String,
    #[serde(default)]
    pub prefix: Option<u8>,
}

impl AgentInterface {
    /// Returns `true` if this interface carries the configured hardware address.
    #[must_use]
    pub fn matches_hwaddr(&self, hwaddr: &str) -> bool {
        self.hardware_address
            .as_deref()
            .is_some_and(|reported| hwaddr_matches(reported, hwaddr))
    }

    /// First address that is not IPv6.
    #[must_use]
    pub fn first_non_ipv6(&self) -> Option<&AgentIpAddress> {
        self.ip_addresses
            .iter()
            .find(|addr| !addr.ip_address_type.eq_ignore_ascii_case("ipv6"))
    }
}

/// A container interface from the node's live interface table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContainerInterface {
    pub name: String,
    #[serde(default)]
    pub hwaddr: Option<String>,
    /// IPv4 address in CIDR notation.
    #[serde(default)]
    pub inet: Option<String>,
    #[serde(default)]
    pub inet6: Option<String>,
}

impl ContainerInterface {
    /// Returns `true` if this interface carries the configured hardware address.
    #[must_use]
    pub fn matches_hwaddr(&self, hwaddr: &str) -> bool {
        self.hwaddr
            .as_deref()
            .is_some_and(|reported| reported.eq_ignore_ascii_case(hwaddr))
    }

    /// IPv4 address without its prefix, plus the prefix length.
    #[must_use]
    pub fn ipv4(&self) -> Option<(&str, Option<u8>)> {
        self.inet
            .as_deref()
            .map(split_cidr)
            .filter(|(address, _)| !address.is_empty())
    }
}
