//! Run-wide settings for the API client and the resolver.

use serde::Deserialize;
use std::time::Duration;

/// Default Proxmox VE API port.
pub const DEFAULT_PORT: u16 = 8006;

/// Token bucket settings for outgoing API requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second.
    pub requests_per_second: u32,
    /// Requests allowed in a burst before throttling kicks in.
    pub burst_size: u32,
}

/// Settings shared by the client and the resolution pipeline.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// How long a login ticket is trusted before logging in again.
    pub ticket_lifetime: Duration,
    /// Optional request throttling, off by default.
    pub rate_limit: Option<RateLimitConfig>,
    /// Reject well-known system accounts as API users.
    pub block_reserved_usernames: bool,
    /// Upper bound for a single forward DNS lookup.
    pub dns_timeout: Duration,
    /// Port used when the options carry none.
    pub default_port: u16,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            ticket_lifetime: Duration::from_secs(2 * 60 * 60),
            rate_limit: None,
            block_reserved_usernames: false,
            dns_timeout: Duration::from_secs(5),
            default_port: DEFAULT_PORT,
        }
    }
}
