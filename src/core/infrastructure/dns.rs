//! Forward DNS lookups used to address guests by their FQDN.

use crate::core::domain::error::{ProxmoxError, ProxmoxResult};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Resolves a host name to one address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Returns the preferred address for `host`.
    ///
    /// # Errors
    /// Returns `ProxmoxError::Resolution` if the name does not resolve in time.
    async fn resolve(&self, host: &str) -> ProxmoxResult<IpAddr>;
}

/// Resolver backed by the operating system, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> ProxmoxResult<IpAddr> {
        let lookup = tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| ProxmoxError::Resolution(format!("DNS resolution of '{}' timed out", host)))?
            .map_err(|e| ProxmoxError::Resolution(format!("DNS resolution of '{}' failed: {}", host, e)))?;

        let addresses: Vec<IpAddr> = lookup.map(|addr| addr.ip()).collect();
        debug!(host, count = addresses.len(), "resolved host");
        addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
            .ok_or_else(|| ProxmoxError::Resolution(format!("No DNS records found for '{}'", host)))
    }
}
