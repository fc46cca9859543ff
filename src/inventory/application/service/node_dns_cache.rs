use std::collections::HashMap;

use crate::core::{
    domain::{error::Lookup, model::node_dns::NodeDnsConfig},
    infrastructure::api_client::ApiClient,
};
use tracing::{debug, warn};

/// Per-run cache of node DNS settings, keyed by node name.
///
/// Each node is asked at most once per run. A failed lookup is cached as
/// well, so later guests on the same node do not retry it.
#[derive(Debug, Default)]
pub struct NodeDnsCache {
    entries: HashMap<String, Option<NodeDnsConfig>>,
}

impl NodeDnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// DNS search domain of `node`, fetched on first use.
    pub async fn search_domain(&mut self, client: &ApiClient, node: &str) -> Option<String> {
        if !self.entries.contains_key(node) {
            let config = Self::fetch(client, node).await;
            self.entries.insert(node.to_string(), config);
        }
        self.entries
            .get(node)
            .and_then(Option::as_ref)
            .and_then(NodeDnsConfig::search_domain)
            .map(str::to_string)
    }

    /// Number of nodes looked up so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    async fn fetch(client: &ApiClient, node: &str) -> Option<NodeDnsConfig> {
        let path = format!("nodes/{}/dns", node);
        match Lookup::from_result(client.get::<NodeDnsConfig>(&path, &[]).await) {
            Lookup::Found(config) => {
                debug!(node, search = ?config.search, "node DNS settings");
                Some(config)
            }
            Lookup::Unavailable(reason) => {
                warn!(node, %reason, "node DNS settings unavailable");
                None
            }
            Lookup::Failed(e) => {
                warn!(node, error = %e, "node DNS lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::infrastructure::api_client::tests::create_authenticated_client;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_fetches_each_node_once() {
        let mock_server = MockServer::start().await;
        let client = create_authenticated_client(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes/pve1/dns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"search": "example.com", "dns1": "192.0.2.53"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut cache = NodeDnsCache::new();
        assert_eq!(cache.len(), 0);
        for _ in 0..3 {
            assert_eq!(
                cache.search_domain(&client, "pve1").await.as_deref(),
                Some("example.com")
            );
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_caches_every_node_separately() {
        let mock_server = MockServer::start().await;
        let client = create_authenticated_client(&mock_server).await;

        for (node, search) in [("pve1", "a.example"), ("pve2", "b.example")] {
            Mock::given(method("GET"))
                .and(path(format!("/api2/json/nodes/{}/dns", node)))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "data": {"search": search}
                })))
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let mut cache = NodeDnsCache::new();
        let mut domains = Vec::new();
        for node in ["pve1", "pve2", "pve1", "pve2"] {
            domains.push(cache.search_domain(&client, node).await);
        }

        assert_eq!(
            domains,
            vec![
                Some("a.example".to_string()),
                Some("b.example".to_string()),
                Some("a.example".to_string()),
                Some("b.example".to_string()),
            ]
        );
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_cached() {
        let mock_server = MockServer::start().await;
        let client = create_authenticated_client(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes/pve2/dns"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut cache = NodeDnsCache::new();
        assert_eq!(cache.search_domain(&client, "pve2").await, None);
        assert_eq!(cache.search_domain(&client, "pve2").await, None);
        assert_eq!(cache.len(), 1);
    }
}
