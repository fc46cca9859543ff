//! Domain model for node DNS configuration from the `/nodes/{node}/dns` endpoint.

use serde::{Deserialize, Serialize};

/// DNS configuration for a Proxmox node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NodeDnsConfig {
    /// DNS search domain (e.g., "example.com").
    #[serde(default)]
    pub search: Option<String>,
    /// First nameserver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns1: Option<String>,
    /// Second nameserver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns2: Option<String>,
    /// Third nameserver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns3: Option<String>,
}

impl NodeDnsConfig {
    /// Returns the search domain, ignoring empty values.
    #[must_use]
    pub fn search_domain(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
