//! The canonical per-guest record the target mapping works on.

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::{Map, Value};

use super::{
    cluster_resource::{ClusterResource, GuestKind},
    guest_config::{
        ConfigEntry, ConfigFamily, ConfigValue, RawConfig, ip_prefix, netmask,
        parse_config_value, parse_indexed_key,
    },
};

/// Value of a network entry address that still waits for DHCP reconciliation.
pub const DHCP: &str = "dhcp";

/// Ordered slots addressed by the numeric suffix of an indexed key.
///
/// Slot `n` holds the value of key `<family>n`; indices that never appeared
/// stay empty, so positions are never compacted.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSequence<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for SlotSequence<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> SlotSequence<T> {
    /// Creates an empty sequence with room for `len` slots.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    /// Stores `value` at `index`, growing the sequence when needed.
    pub fn place(&mut self, index: usize, value: T) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Number of slots, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Occupied slots with their index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }

    /// Occupied slots with their index, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (i, v)))
    }
}

impl<T: Serialize> Serialize for SlotSequence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.slots.len()))?;
        for slot in &self.slots {
            seq.serialize_element(slot)?;
        }
        seq.end()
    }
}

/// A guest configuration reshaped into its canonical form and merged with
/// the cluster resource it was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// The cluster summary of the guest.
    pub resource: ClusterResource,
    /// Derived fully qualified domain name.
    pub fqdn: String,
    /// Configuration keys outside the indexed families, decoded.
    pub config: IndexMap<String, ConfigValue>,
    /// Indexed families (`net`, `mp`, `unused`, `ipconfig`).
    pub families: IndexMap<ConfigFamily, SlotSequence<ConfigValue>>,
}

impl NormalizedRecord {
    /// Reshapes a raw configuration.
    ///
    /// The first pass sizes one sequence per indexed family from the highest
    /// index present; the second decodes every value and places family
    /// members at their index. Network and cloud-init entries also get a
    /// `netmask` when their `ip` carried a CIDR prefix.
    #[must_use]
    pub fn reshape(resource: ClusterResource, raw: &RawConfig, fqdn: String) -> Self {
        let mut families: IndexMap<ConfigFamily, SlotSequence<ConfigValue>> = IndexMap::new();
        for (family, index) in raw.0.keys().filter_map(|k| parse_indexed_key(k)) {
            let slots = families.entry(family).or_default();
            if index >= slots.len() {
                *slots = SlotSequence::with_len(index + 1);
            }
        }

        let mut config = IndexMap::new();
        for (key, value) in &raw.0 {
            let decoded = parse_config_value(key, value);
            match parse_indexed_key(key) {
                Some((family, index)) => {
                    let decoded = with_netmask(family, value, decoded);
                    families.entry(family).or_default().place(index, decoded);
                }
                None => {
                    config.insert(key.clone(), decoded);
                }
            }
        }

        Self {
            resource,
            fqdn,
            config,
            families,
        }
    }

    /// Guest kind of the originating resource.
    #[must_use]
    pub fn kind(&self) -> GuestKind {
        self.resource.kind
    }

    /// The sequence of a family, if the configuration had any member of it.
    #[must_use]
    pub fn family(&self, family: ConfigFamily) -> Option<&SlotSequence<ConfigValue>> {
        self.families.get(&family)
    }

    pub fn family_mut(&mut self, family: ConfigFamily) -> Option<&mut SlotSequence<ConfigValue>> {
        self.families.get_mut(&family)
    }

    /// Decoded network entry at `index`.
    #[must_use]
    pub fn network(&self, index: usize) -> Option<&ConfigEntry> {
        self.family(ConfigFamily::Net)
            .and_then(|net| net.get(index))
            .and_then(ConfigValue::as_entry)
    }

    /// Address of the first network entry.
    #[must_use]
    pub fn primary_ip(&self) -> Option<&str> {
        self.network(0)
            .and_then(|entry| entry.get("ip"))
            .map(String::as_str)
    }

    /// Returns `true` when the first network entry carries a usable address.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        self.primary_ip()
            .is_some_and(|ip| !ip.is_empty() && ip != DHCP)
    }

    /// Flattens the record into one JSON object.
    ///
    /// Configuration keys come first, then the family sequences and `fqdn`;
    /// resource fields are merged last and win on conflicting keys.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.config {
            map.insert(key.clone(), to_json(value));
        }
        for (family, slots) in &self.families {
            map.insert(family.as_str().to_string(), to_json(slots));
        }
        map.insert("fqdn".to_string(), Value::String(self.fqdn.clone()));
        map.extend(self.resource.to_map());
        Value::Object(map)
    }
}

fn with_netmask(family: ConfigFamily, raw: &Value, decoded: ConfigValue) -> ConfigValue {
    let ConfigValue::Entry(mut entry) = decoded else {
        return decoded;
    };
    if matches!(family, ConfigFamily::Net | ConfigFamily::IpConfig) {
        if let Some(mask) = raw.as_str().and_then(ip_prefix).and_then(netmask) {
            entry.insert("netmask".to_string(), mask);
        }
    }
    ConfigValue::Entry(entry)
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(kind: &str) -> ClusterResource {
        serde_json::from_value(json!({
            "type": kind, "vmid": 100, "node": "pve1", "id": format!("{kind}/100"),
            "status": "running", "name": "web1"
        }))
        .unwrap()
    }

    fn raw(value: Value) -> RawConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_family_members_land_at_their_index() {
        let config = raw(json!({
            "net2": "name=eth2,hwaddr=AA:BB:CC:DD:EE:02,ip=dhcp",
            "mp1": "local:subvol-100-disk-1,mp=/srv",
            "net0": "name=eth0,hwaddr=AA:BB:CC:DD:EE:00,ip=192.0.2.5/24",
            "unused0": "local-lvm:vm-100-disk-3",
            "memory": 512
        }));
        let record = NormalizedRecord::reshape(resource("lxc"), &config, "web1.example.com".into());

        let net = record.family(ConfigFamily::Net).unwrap();
        assert_eq!(net.len(), 3);
        assert!(net.get(1).is_none());
        assert_eq!(net.get(2).unwrap().as_entry().unwrap()["name"], "eth2");
        assert_eq!(record.network(0).unwrap()["ip"], "192.0.2.5");
        assert_eq!(record.network(0).unwrap()["netmask"], "255.255.255.0");

        let mp = record.family(ConfigFamily::Mp).unwrap();
        assert_eq!(mp.len(), 2);
        assert!(mp.get(0).is_none());
        assert_eq!(mp.get(1).unwrap().as_entry().unwrap()["mp"], "/srv");

        assert_eq!(
            record.family(ConfigFamily::Unused).unwrap().get(0),
            Some(&ConfigValue::Text("local-lvm:vm-100-disk-3".to_string()))
        );
        assert_eq!(record.config["memory"], ConfigValue::Other(json!(512)));
        assert!(record.family(ConfigFamily::IpConfig).is_none());
    }

    #[test]
    fn test_addressable() {
        let record = NormalizedRecord::reshape(
            resource("lxc"),
            &raw(json!({"net0": "name=eth0,ip=dhcp"})),
            "web1".into(),
        );
        assert!(!record.is_addressable());

        let record = NormalizedRecord::reshape(resource("lxc"), &raw(json!({})), "web1".into());
        assert!(!record.is_addressable());

        let record = NormalizedRecord::reshape(
            resource("lxc"),
            &raw(json!({"net1": "name=eth1,ip=192.0.2.9/24"})),
            "web1".into(),
        );
        assert!(!record.is_addressable());

        let record = NormalizedRecord::reshape(
            resource("lxc"),
            &raw(json!({"net0": "name=eth0,ip=192.0.2.9/24"})),
            "web1".into(),
        );
        assert!(record.is_addressable());
    }

    #[test]
    fn test_to_value_merges_resource_last() {
        let record = NormalizedRecord::reshape(
            resource("qemu"),
            &raw(json!({
                "name": "config-name",
                "cores": 2,
                "net1": "virtio=AA:BB:CC:DD:EE:01,bridge=vmbr0"
            })),
            "web1.example.com".into(),
        );
        let value = record.to_value();
        assert_eq!(value["name"], "web1");
        assert_eq!(value["cores"], 2);
        assert_eq!(value["fqdn"], "web1.example.com");
        assert_eq!(value["id"], "qemu/100");
        assert_eq!(value["type"], "qemu");
        assert_eq!(value["net"][0], Value::Null);
        assert_eq!(value["net"][1]["bridge"], "vmbr0");
    }
}
