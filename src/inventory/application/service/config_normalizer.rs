use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    core::{
        domain::{
            error::{Lookup, ProxmoxResult, ValidationError},
            model::{
                cluster_resource::{ClusterResource, GuestKind},
                guest_config::{ConfigEntry, ConfigFamily, ConfigValue, RawConfig, find_mac_key, netmask},
                guest_interface::{AgentInterface, AgentNetworkResponse, ContainerInterface},
                normalized_record::{DHCP, NormalizedRecord},
            },
        },
        infrastructure::{api_client::ApiClient, dns::HostResolver},
    },
    inventory::application::service::node_dns_cache::NodeDnsCache,
};

/// Fetches each guest's configuration and turns it into a [`NormalizedRecord`].
pub struct ConfigNormalizer<'a> {
    client: &'a ApiClient,
    resolver: &'a dyn HostResolver,
}

impl<'a> ConfigNormalizer<'a> {
    pub fn new(client: &'a ApiClient, resolver: &'a dyn HostResolver) -> Self {
        Self { client, resolver }
    }

    /// Normalizes one guest.
    ///
    /// Network addresses are completed in this order: cloud-init `ipconfigN`,
    /// live state (guest agent for VMs, node interface table for containers),
    /// and finally a forward lookup of the FQDN.
    ///
    /// # Errors
    /// The configuration fetch is fatal, as is a guest agent answer that does
    /// not have the expected shape. Every other sub-lookup only leaves fields
    /// unresolved.
    #[instrument(skip(self, resource, node_dns), fields(id = %resource.id))]
    pub async fn execute(
        &self,
        resource: ClusterResource,
        node_dns: &mut NodeDnsCache,
    ) -> ProxmoxResult<NormalizedRecord> {
        let Some(node) = resource.node().map(str::to_string) else {
            return Err(ValidationError::Field {
                field: "node".to_string(),
                message: format!("Resource {} is not placed on a node", resource.id),
            }
            .into());
        };
        let guest = resource.guest_path();

        let raw: RawConfig = self
            .client
            .get(&format!("nodes/{}/{}/config", node, guest), &[("current", "1")])
            .await?;
        let fqdn = self.fqdn(&resource, &raw, &node, node_dns).await;

        let mut record = NormalizedRecord::reshape(resource, &raw, fqdn);
        if let Some(net) = record.family_mut(ConfigFamily::Net) {
            net.iter_mut()
                .filter_map(|(_, value)| value.as_entry_mut())
                .for_each(assign_hwaddr);
        }
        apply_cloud_init(&mut record);

        match record.kind() {
            GuestKind::Qemu => self.reconcile_agent(&mut record, &node, &guest).await?,
            GuestKind::Lxc => self.reconcile_container(&mut record, &node, &guest).await,
            GuestKind::Other => {}
        }
        self.resolve_by_fqdn(&mut record).await;

        Ok(record)
    }

    /// `hostname` (containers) or `name` (VMs), joined with the guest's search
    /// domain or, failing that, the node's.
    async fn fqdn(
        &self,
        resource: &ClusterResource,
        raw: &RawConfig,
        node: &str,
        node_dns: &mut NodeDnsCache,
    ) -> String {
        let host = raw
            .host_name()
            .or_else(|| resource.extra.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| resource.vmid.map_or_else(|| resource.id.clone(), |v| v.to_string()));

        let domain = match raw.search_domain() {
            Some(domain) => Some(domain.to_string()),
            None => node_dns.search_domain(self.client, node).await,
        };
        match domain {
            Some(domain) => format!("{}.{}", host, domain),
            None => host,
        }
    }

    async fn reconcile_agent(
        &self,
        record: &mut NormalizedRecord,
        node: &str,
        guest: &str,
    ) -> ProxmoxResult<()> {
        if !has_pending_address(record) {
            return Ok(());
        }

        let endpoint = format!("nodes/{}/{}/agent/network-get-interfaces", node, guest);
        let interfaces = match Lookup::from_result(self.client.get::<Value>(&endpoint, &[]).await) {
            Lookup::Found(response) => parse_agent_response(&endpoint, response)?,
            Lookup::Unavailable(reason) => {
                debug!(%reason, "guest agent unavailable");
                return Ok(());
            }
            Lookup::Failed(e) => {
                warn!(error = %e, "guest agent lookup failed");
                return Ok(());
            }
        };

        for entry in pending_entries(record) {
            let Some(hwaddr) = entry.get("hwaddr") else {
                continue;
            };
            let Some(iface) = interfaces.iter().find(|i| i.matches_hwaddr(hwaddr)) else {
                continue;
            };
            entry.insert("name".to_string(), iface.name.clone());
            if let Some(addr) = iface.first_non_ipv6() {
                set_address(entry, &addr.ip_address, addr.prefix);
            }
        }
        Ok(())
    }

    async fn reconcile_container(&self, record: &mut NormalizedRecord, node: &str, guest: &str) {
        let dhcp_pending = |entry: &ConfigEntry| entry.get("ip").is_some_and(|ip| ip == DHCP);
        let any_dhcp = record
            .family(ConfigFamily::Net)
            .is_some_and(|net| net.iter().filter_map(|(_, v)| v.as_entry()).any(dhcp_pending));
        if !any_dhcp {
            return;
        }

        let path = format!("nodes/{}/{}/interfaces", node, guest);
        let interfaces: Vec<ContainerInterface> =
            match Lookup::from_result(self.client.get(&path, &[]).await) {
                Lookup::Found(interfaces) => interfaces,
                Lookup::Unavailable(reason) => {
                    debug!(%reason, "container interfaces unavailable");
                    return;
                }
                Lookup::Failed(e) => {
                    warn!(error = %e, "container interface lookup failed");
                    return;
                }
            };

        for entry in pending_entries(record).filter(|e| dhcp_pending(&**e)) {
            let Some(hwaddr) = entry.get("hwaddr") else {
                continue;
            };
            let address = interfaces
                .iter()
                .filter(|i| i.matches_hwaddr(hwaddr))
                .find_map(ContainerInterface::ipv4)
                .map(|(ip, prefix)| (ip.to_string(), prefix));
            if let Some((ip, prefix)) = address {
                set_address(entry, &ip, prefix);
            }
        }
    }

    /// Last resort for entries still without an address: resolve the FQDN,
    /// at most once per guest.
    async fn resolve_by_fqdn(&self, record: &mut NormalizedRecord) {
        let fqdn = record.fqdn.clone();
        let mut resolved: Option<Option<String>> = None;

        for entry in pending_entries(record) {
            if resolved.is_none() {
                let address = match self.resolver.resolve(&fqdn).await {
                    Ok(ip) => Some(ip.to_string()),
                    Err(e) => {
                        debug!(%fqdn, error = %e, "FQDN does not resolve");
                        None
                    }
                };
                resolved = Some(address);
            }
            if let Some(Some(ip)) = &resolved {
                entry.insert("ip".to_string(), ip.clone());
            }
        }
    }
}

/// Drops records whose first network entry has no usable address.
pub fn filter_addressable(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    records
        .into_iter()
        .filter(|record| {
            let keep = record.is_addressable();
            if !keep {
                debug!(id = %record.resource.id, ip = ?record.primary_ip(), "skipping guest without address");
            }
            keep
        })
        .collect()
}

/// Moves the MAC address of a VM network entry to `hwaddr` (uppercased) and
/// records the device model it was keyed by as `type`.
fn assign_hwaddr(entry: &mut ConfigEntry) {
    if entry.contains_key("hwaddr") {
        return;
    }
    let Some(device) = find_mac_key(entry).map(str::to_string) else {
        return;
    };
    let Some(mac) = entry.shift_remove(&device) else {
        return;
    };

    let mut reshaped = ConfigEntry::with_capacity(entry.len() + 2);
    reshaped.insert("hwaddr".to_string(), mac.to_uppercase());
    reshaped.insert("type".to_string(), device);
    reshaped.extend(entry.drain(..));
    *entry = reshaped;
}

/// Copies `ipconfigN.ip` (and its netmask) onto `net[N]`.
fn apply_cloud_init(record: &mut NormalizedRecord) {
    let overrides: Vec<(usize, String, Option<String>)> = record
        .family(ConfigFamily::IpConfig)
        .map(|slots| {
            slots
                .iter()
                .filter_map(|(index, value)| {
                    let entry = value.as_entry()?;
                    let ip = entry.get("ip")?.clone();
                    Some((index, ip, entry.get("netmask").cloned()))
                })
                .collect()
        })
        .unwrap_or_default();

    let Some(net) = record.family_mut(ConfigFamily::Net) else {
        return;
    };
    for (index, ip, mask) in overrides {
        let Some(entry) = net.get_mut(index).and_then(ConfigValue::as_entry_mut) else {
            continue;
        };
        entry.insert("ip".to_string(), ip);
        match mask {
            Some(mask) => {
                entry.insert("netmask".to_string(), mask);
            }
            None => {
                entry.shift_remove("netmask");
            }
        }
    }
}

fn needs_address(entry: &ConfigEntry) -> bool {
    entry.get("ip").is_none_or(|ip| ip.is_empty() || ip == DHCP)
}

fn has_pending_address(record: &NormalizedRecord) -> bool {
    record.family(ConfigFamily::Net).is_some_and(|net| {
        net.iter()
            .filter_map(|(_, value)| value.as_entry())
            .any(needs_address)
    })
}

fn pending_entries(record: &mut NormalizedRecord) -> impl Iterator<Item = &mut ConfigEntry> {
    record
        .family_mut(ConfigFamily::Net)
        .into_iter()
        .flat_map(|net| net.iter_mut())
        .filter_map(|(_, value)| value.as_entry_mut())
        .filter(|entry| needs_address(&**entry))
}

fn set_address(entry: &mut ConfigEntry, ip: &str, prefix: Option<u8>) {
    entry.insert("ip".to_string(), ip.to_string());
    if let Some(mask) = prefix.and_then(netmask) {
        entry.insert("netmask".to_string(), mask);
    }
}

fn parse_agent_response(endpoint: &str, response: Value) -> ProxmoxResult<Vec<AgentInterface>> {
    match serde_json::from_value::<AgentNetworkResponse>(response.clone()) {
        Ok(parsed) => Ok(parsed.result),
        Err(_) => Err(ValidationError::Reconciliation {
            endpoint: endpoint.to_string(),
            response: response.to_string(),
        }
        .into()),
    }
}
