//! Resolves running Proxmox VE guests into orchestration targets.
//!
//! The resolver logs in to a cluster, lists its running virtual machines and
//! containers, reshapes each guest's configuration into a uniform record and
//! maps the records through a caller-supplied template.
//!
//! # Examples
//!
//! ```no_run
//! use proxmox_inventory::{InventoryResolver, ProxmoxResult, ResolveRequest, ValidationConfig};
//!
//! #[tokio::main]
//! async fn main() -> ProxmoxResult<()> {
//!     let request: ResolveRequest = serde_json::from_value(serde_json::json!({
//!         "host": "pve.example.com",
//!         "token": "bolt@pve!inventory",
//!         "secret": "00000000-0000-0000-0000-000000000000",
//!         "type": "qemu",
//!         "target_mapping": {"name": "name", "uri": "net.0.ip"}
//!     }))
//!     .expect("valid options");
//!
//!     let targets = InventoryResolver::new(ValidationConfig::default())
//!         .resolve_reference(request)
//!         .await?;
//!     println!("{} targets", targets.len());
//!     Ok(())
//! }
//! ```

mod auth;
mod config;
mod core;
mod inventory;

use std::sync::Arc;

pub use crate::config::{DEFAULT_PORT, RateLimitConfig, ValidationConfig};
pub use crate::core::domain::error::{
    Lookup, ProxmoxError, ProxmoxResult, VALIDATION_ERROR_KIND, ValidationError,
};
pub use crate::core::domain::model::{
    cluster_resource::{ClusterResource, GuestFilter, GuestKind},
    guest_config::{ConfigEntry, ConfigFamily, ConfigValue},
    normalized_record::{NormalizedRecord, SlotSequence},
    target::{TargetDescriptor, Template},
};
pub use crate::core::infrastructure::dns::{HostResolver, SystemResolver};
pub use crate::inventory::application::{
    request::resolve_request::ResolveRequest,
    response::task_response::{TaskError, TaskErrorBody, TaskOutput},
};

use crate::{
    core::infrastructure::api_client::ApiClient,
    inventory::application::service::{
        client_factory::ClientFactory,
        config_normalizer::{ConfigNormalizer, filter_addressable},
        node_dns_cache::NodeDnsCache,
        resource_lister::ResourceLister,
        target_mapper::TargetMapper,
    },
};
use tracing::{info, instrument};

/// Runs the whole resolution pipeline for one options mapping.
///
/// Guests are processed one after another; each run gets its own client and
/// its own node DNS cache.
pub struct InventoryResolver {
    factory: ClientFactory,
    resolver: Arc<dyn HostResolver>,
}

impl InventoryResolver {
    /// Creates a resolver that looks up FQDNs with the system resolver.
    pub fn new(config: ValidationConfig) -> Self {
        let resolver = Arc::new(SystemResolver::new(config.dns_timeout));
        Self {
            factory: ClientFactory::new(config),
            resolver,
        }
    }

    /// Replaces the DNS resolver used for FQDN fallbacks.
    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Resolves the options into target descriptors.
    ///
    /// # Errors
    /// - `ProxmoxError::Validation` for a template without `name`/`uri`, incomplete
    ///   credentials, or an unexpected guest agent answer
    /// - `ProxmoxError::Connection` / `ProxmoxError::Authentication` if the cluster
    ///   cannot be reached or rejects the credentials
    /// - `ProxmoxError::Api` if listing resources or fetching a guest configuration fails
    #[instrument(skip_all, fields(host = request.host.as_deref().unwrap_or_default()))]
    pub async fn resolve_reference(
        &self,
        request: ResolveRequest,
    ) -> ProxmoxResult<Vec<TargetDescriptor>> {
        let template = Template::new(request.target_mapping.clone().unwrap_or_default())?;
        let client = self.factory.execute(&request).await?;
        self.resolve_with_client(&client, &template, request.guest_filter)
            .await
    }

    /// Runs [`resolve_reference`](Self::resolve_reference) and wraps the targets
    /// in the task result envelope.
    ///
    /// # Errors
    /// Same as [`resolve_reference`](Self::resolve_reference).
    pub async fn task(&self, request: ResolveRequest) -> ProxmoxResult<TaskOutput> {
        let value = self.resolve_reference(request).await?;
        Ok(TaskOutput { value })
    }

    async fn resolve_with_client(
        &self,
        client: &ApiClient,
        template: &Template,
        filter: GuestFilter,
    ) -> ProxmoxResult<Vec<TargetDescriptor>> {
        let resources = ResourceLister::new().execute(client, filter).await?;

        let normalizer = ConfigNormalizer::new(client, self.resolver.as_ref());
        let mut node_dns = NodeDnsCache::new();
        let mut records = Vec::with_capacity(resources.len());
        for resource in resources {
            records.push(normalizer.execute(resource, &mut node_dns).await?);
        }

        let listed = records.len();
        let records = filter_addressable(records);
        let targets = TargetMapper::new(template.clone()).execute(&records);
        info!(
            listed,
            nodes = node_dns.len(),
            targets = targets.len(),
            "resolved inventory"
        );
        Ok(targets)
    }
}

impl Default for InventoryResolver {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests;
