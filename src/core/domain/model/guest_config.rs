//! Guest configuration as returned by `/nodes/{node}/{type}/{vmid}/config`, and the
//! primitives that decode its comma-separated `key=value` property strings.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Key assigned to a property part that carries no `=` (e.g. a volume id).
pub const BARE_PART_KEY: &str = "storage";

/// Highest family index accepted; Proxmox itself stays far below this.
const MAX_FAMILY_INDEX: usize = 1023;

/// Free-text keys that are never decoded.
const FREE_TEXT_KEYS: [&str; 1] = ["description"];

static INDEXED_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(net|mp|unused|ipconfig)(\d+)$").expect("indexed key regex")
});

static MAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}(?::?[0-9A-Fa-f]{2}){5}$").expect("mac address regex")
});

/// A decoded property string, in the order the properties appeared.
pub type ConfigEntry = IndexMap<String, String>;

/// A guest configuration value after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A property string such as `virtio=AA:BB:CC:DD:EE:FF,bridge=vmbr0`.
    Entry(ConfigEntry),
    /// A plain string value.
    Text(String),
    /// Numbers, booleans and anything else, kept verbatim.
    Other(Value),
}

impl ConfigValue {
    /// Returns the decoded entry, if this value is one.
    #[must_use]
    pub fn as_entry(&self) -> Option<&ConfigEntry> {
        match self {
            ConfigValue::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_entry_mut(&mut self) -> Option<&mut ConfigEntry> {
        match self {
            ConfigValue::Entry(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Indexed key families that are reshaped into ordered sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigFamily {
    /// Network devices (`net0`, `net1`, ...).
    Net,
    /// Container mount points (`mp0`, ...).
    Mp,
    /// Detached volumes (`unused0`, ...).
    Unused,
    /// Cloud-init interface settings (`ipconfig0`, ...).
    IpConfig,
}

impl ConfigFamily {
    /// Key prefix, which is also the attribute name of the reshaped sequence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFamily::Net => "net",
            ConfigFamily::Mp => "mp",
            ConfigFamily::Unused => "unused",
            ConfigFamily::IpConfig => "ipconfig",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "net" => Some(ConfigFamily::Net),
            "mp" => Some(ConfigFamily::Mp),
            "unused" => Some(ConfigFamily::Unused),
            "ipconfig" => Some(ConfigFamily::IpConfig),
            _ => None,
        }
    }
}

/// Splits an indexed key such as `net3` into its family and index.
#[must_use]
pub fn parse_indexed_key(key: &str) -> Option<(ConfigFamily, usize)> {
    let caps = INDEXED_KEY_RE.captures(key)?;
    let family = ConfigFamily::from_prefix(&caps[1])?;
    let index = caps[2].parse::<usize>().ok()?;
    (index <= MAX_FAMILY_INDEX).then_some((family, index))
}

/// Raw guest configuration, keyed as the API reports it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawConfig(pub IndexMap<String, Value>);

impl RawConfig {
    fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Guest host name: `hostname` for containers, `name` for virtual machines.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.text("hostname").or_else(|| self.text("name"))
    }

    /// Guest-level DNS search domain, if configured.
    #[must_use]
    pub fn search_domain(&self) -> Option<&str> {
        self.text("searchdomain")
    }
}

/// Decodes a single configuration value.
///
/// Strings holding at least one `=` become a [`ConfigEntry`]; other strings
/// stay text; non-string JSON values are kept as they are.
#[must_use]
pub fn parse_config_value(key: &str, value: &Value) -> ConfigValue {
    match value {
        Value::String(s) if s.contains('=') && !FREE_TEXT_KEYS.contains(&key) => {
            ConfigValue::Entry(decode_entry(s))
        }
        Value::String(s) => ConfigValue::Text(s.clone()),
        other => ConfigValue::Other(other.clone()),
    }
}

/// Decodes a property string into an ordered mapping.
///
/// Parts are split on `,` and then on the first `=`. A part without `=` is
/// stored under [`BARE_PART_KEY`]. A CIDR suffix on `ip` is stripped.
#[must_use]
pub fn decode_entry(raw: &str) -> ConfigEntry {
    let mut entry = ConfigEntry::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((key, value)) => entry.insert(key.to_string(), value.to_string()),
            None => entry.insert(BARE_PART_KEY.to_string(), part.to_string()),
        };
    }
    if let Some(ip) = entry.get_mut("ip") {
        let (address, _) = split_cidr(ip);
        *ip = address.to_string();
    }
    entry
}

/// Prefix length carried by the `ip` property of a raw property string.
#[must_use]
pub fn ip_prefix(raw: &str) -> Option<u8> {
    raw.split(',')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == "ip")
        .and_then(|(_, value)| split_cidr(value).1)
}

/// Splits `192.0.2.5/24` into the address and its prefix length.
#[must_use]
pub fn split_cidr(value: &str) -> (&str, Option<u8>) {
    match value.split_once('/') {
        Some((address, prefix)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => {
            (address, prefix.parse().ok())
        }
        _ => (value, None),
    }
}

/// Converts an IPv4 prefix length into a dotted-decimal netmask.
#[must_use]
pub fn netmask(prefix: u8) -> Option<String> {
    if prefix > 32 {
        return None;
    }
    let bits = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    Some(Ipv4Addr::from(bits).to_string())
}

/// Returns `true` if `value` looks like a MAC address, with or without colons.
#[must_use]
pub fn is_mac_address(value: &str) -> bool {
    MAC_RE.is_match(value)
}

/// Returns the first key, in entry order, whose value is a MAC address.
#[must_use]
pub fn find_mac_key(entry: &ConfigEntry) -> Option<&str> {
    entry
        .iter()
        .find(|(_, value)| is_mac_address(value))
        .map(|(key, _)| key.as_str())
}

/// Compares a hardware address reported at runtime with a configured one.
///
/// The reported address is left-padded with `0` to 17 characters, since some
/// guest agents drop the leading zero of the first octet.
#[must_use]
pub fn hwaddr_matches(reported: &str, configured: &str) -> bool {
    let padded = format!("{:0>17}", reported);
    padded.eq_ignore_ascii_case(configured)
}
