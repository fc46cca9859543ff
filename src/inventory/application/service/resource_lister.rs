use crate::core::{
    domain::{
        error::ProxmoxResult,
        model::cluster_resource::{ClusterResource, GuestFilter},
    },
    infrastructure::api_client::ApiClient,
};
use tracing::{debug, instrument};

/// Lists the running guests of the cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceLister;

impl ResourceLister {
    pub fn new() -> Self {
        Self
    }

    /// Fetches `cluster/resources?type=vm` once and keeps running guests that
    /// pass `filter` and sit on a node, in the order the API reported them.
    ///
    /// # Errors
    /// Any failure of the listing call is fatal for the run.
    #[instrument(skip(self, client))]
    pub async fn execute(
        &self,
        client: &ApiClient,
        filter: GuestFilter,
    ) -> ProxmoxResult<Vec<ClusterResource>> {
        let resources: Vec<ClusterResource> =
            client.get("cluster/resources", &[("type", "vm")]).await?;
        let total = resources.len();

        let selected: Vec<ClusterResource> = resources
            .into_iter()
            .filter(|res| filter.matches(res.kind) && res.is_running() && res.node().is_some())
            .collect();

        debug!(total, selected = selected.len(), "listed cluster resources");
        Ok(selected)
    }
}
