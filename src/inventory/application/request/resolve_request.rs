use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    config::RateLimitConfig,
    core::domain::{model::cluster_resource::GuestFilter, value_object::serde_helpers},
};

/// Options mapping handed to the resolver by the plugin host.
///
/// Keys the resolver does not know (`_boltdir`, `_cache`, ...) are ignored.
#[derive(Clone, Default, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, with = "serde_helpers::port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub realm: Option<String>,
    /// One-time password for accounts with a second factor.
    #[serde(default)]
    pub otp: Option<String>,
    /// API token id, `USER@REALM!TOKENID`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub verify_ssl: Option<bool>,
    #[serde(rename = "type", default)]
    pub guest_filter: GuestFilter,
    #[serde(default)]
    pub target_mapping: Option<Map<String, Value>>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl std::fmt::Debug for ResolveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("token", &self.token)
            .field("verify_ssl", &self.verify_ssl)
            .field("guest_filter", &self.guest_filter)
            .field("target_mapping", &self.target_mapping)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_bolt_options() {
        let request: ResolveRequest = serde_json::from_value(json!({
            "host": "pve.example.com",
            "port": "8443",
            "username": "bolt",
            "password": "s3cret",
            "realm": "pve",
            "verify_ssl": false,
            "type": "qemu",
            "target_mapping": {"name": "name", "uri": "fqdn"},
            "_boltdir": "/home/ops/project"
        }))
        .unwrap();

        assert_eq!(request.host.as_deref(), Some("pve.example.com"));
        assert_eq!(request.port, Some(8443));
        assert_eq!(request.verify_ssl, Some(false));
        assert_eq!(request.guest_filter, GuestFilter::Qemu);
        assert_eq!(request.target_mapping.unwrap()["uri"], "fqdn");
        assert!(request.rate_limit.is_none());
    }

    #[test]
    fn test_defaults_and_redacted_debug() {
        let request: ResolveRequest = serde_json::from_value(json!({
            "host": "pve", "port": 8006, "token": "bolt@pve!inv", "secret": "abc"
        }))
        .unwrap();
        assert_eq!(request.port, Some(8006));
        assert_eq!(request.guest_filter, GuestFilter::All);
        assert!(request.target_mapping.is_none());

        let debug = format!("{:?}", request);
        assert!(debug.contains("bolt@pve!inv"));
        assert!(!debug.contains("abc"));
    }
}
