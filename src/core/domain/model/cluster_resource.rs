//! Domain models for cluster-wide resources.
//!
//! This module defines the structures returned by the `/cluster/resources?type=vm`
//! endpoint: one summary per guest, QEMU virtual machine or LXC container.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of guest a resource describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestKind {
    /// A QEMU virtual machine.
    Qemu,
    /// An LXC container.
    Lxc,
    /// Anything else the endpoint may report (storage, node, pool, ...).
    #[serde(other)]
    Other,
}

impl GuestKind {
    /// Path segment used by the node-scoped guest endpoints.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestKind::Qemu => "qemu",
            GuestKind::Lxc => "lxc",
            GuestKind::Other => "other",
        }
    }
}

impl fmt::Display for GuestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which guest kinds a resolution run selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestFilter {
    /// Virtual machines only.
    Qemu,
    /// Containers only.
    Lxc,
    /// Both virtual machines and containers.
    #[default]
    All,
}

impl GuestFilter {
    /// Returns `true` if a resource of `kind` passes this filter.
    #[must_use]
    pub fn matches(&self, kind: GuestKind) -> bool {
        match self {
            GuestFilter::Qemu => kind == GuestKind::Qemu,
            GuestFilter::Lxc => kind == GuestKind::Lxc,
            GuestFilter::All => matches!(kind, GuestKind::Qemu | GuestKind::Lxc),
        }
    }
}

/// A guest resource discovered in the Proxmox cluster.
///
/// Only the fields the resolver relies on are typed; everything else the
/// endpoint reports (`maxmem`, `uptime`, `tags`, ...) is kept in `extra` so it
/// can still be referenced from a target mapping.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClusterResource {
    /// Guest kind (`qemu` or `lxc`).
    #[serde(rename = "type")]
    pub kind: GuestKind,
    /// The Proxmox node where this guest resides.
    #[serde(default)]
    pub node: Option<String>,
    /// Unique resource identifier (e.g., `qemu/100`).
    pub id: String,
    /// The guest identifier (unique per cluster).
    #[serde(default)]
    pub vmid: Option<u32>,
    /// Resource status (e.g., `running`, `stopped`).
    #[serde(default)]
    pub status: Option<String>,
    /// Remaining fields, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClusterResource {
    /// Returns `true` when the guest is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.as_deref() == Some("running")
    }

    /// Returns the node name, if the resource is placed on one.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref().filter(|n| !n.is_empty())
    }

    /// API path of the guest below its node, e.g. `qemu/100`.
    ///
    /// The resource `id` already has this shape; `vmid` is used as a fallback.
    #[must_use]
    pub fn guest_path(&self) -> String {
        if self.id.contains('/') {
            self.id.clone()
        } else {
            let vmid = self.vmid.map(|v| v.to_string()).unwrap_or_else(|| self.id.clone());
            format!("{}/{}", self.kind, vmid)
        }
    }

    /// Serializes the resource back into a flat JSON object.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_guest_resources() {
        let resources: Vec<ClusterResource> = serde_json::from_value(json!([
            {
                "type": "qemu",
                "vmid": 100,
                "node": "pve1",
                "id": "qemu/100",
                "name": "ubuntu-vm",
                "status": "running",
                "maxmem": 8589934592_i64
            },
            {
                "type": "lxc",
                "vmid": 200,
                "node": "pve2",
                "id": "lxc/200",
                "status": "stopped"
            },
            {
                "type": "storage",
                "node": "pve1",
                "id": "storage/pve1/local",
                "status": "available"
            }
        ]))
        .unwrap();

        assert_eq!(resources[0].kind, GuestKind::Qemu);
        assert!(resources[0].is_running());
        assert_eq!(resources[0].extra["name"], "ubuntu-vm");
        assert_eq!(resources[0].extra["maxmem"], 8589934592_i64);
        assert_eq!(resources[1].kind, GuestKind::Lxc);
        assert!(!resources[1].is_running());
        assert_eq!(resources[2].kind, GuestKind::Other);
    }

    #[test]
    fn test_guest_filter() {
        let filter: GuestFilter = serde_json::from_value(json!("lxc")).unwrap();
        assert!(filter.matches(GuestKind::Lxc));
        assert!(!filter.matches(GuestKind::Qemu));

        assert!(GuestFilter::default().matches(GuestKind::Qemu));
        assert!(GuestFilter::All.matches(GuestKind::Lxc));
        assert!(!GuestFilter::All.matches(GuestKind::Other));
        assert!(serde_json::from_value::<GuestFilter>(json!("vm")).is_err());
    }

    #[test]
    fn test_guest_path_and_map() {
        let resource: ClusterResource = serde_json::from_value(json!({
            "type": "lxc", "vmid": 200, "node": "pve2", "id": "lxc/200", "status": "running"
        }))
        .unwrap();
        assert_eq!(resource.guest_path(), "lxc/200");

        let map = resource.to_map();
        assert_eq!(map["type"], "lxc");
        assert_eq!(map["node"], "pve2");
        assert_eq!(map["vmid"], 200);

        let bare: ClusterResource =
            serde_json::from_value(json!({"type": "qemu", "vmid": 101, "id": "101"})).unwrap();
        assert_eq!(bare.guest_path(), "qemu/101");
        assert_eq!(bare.node(), None);
    }
}
