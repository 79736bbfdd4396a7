//! Multi-node client assembled from shared pools

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::debug;

use super::router::{Router, RouterOptions};
use crate::client::ControlPlane;
use crate::config::{ClusterConfig, NodeId};
use crate::pool::{EndpointKey, Pool, PoolRegistry, PooledConnection};
use crate::utils::{RegistryError, Result};

/// Routing metadata for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub id: NodeId,
    pub key: EndpointKey,
}

impl HostInfo {
    /// `host:port` (or socket path), used in diagnostics
    pub fn address(&self) -> String {
        self.key.address()
    }
}

/// A cluster of nodes, each backed by the registry's pool for its endpoint
///
/// Immutable once shared. Callers either pick a node by id, or route by key
/// through an attached `Router`, which sees the cluster's `router_options`.
pub struct ClusterClient {
    name: Option<String>,
    hosts: BTreeMap<NodeId, HostInfo>,
    pools: BTreeMap<NodeId, Arc<Pool>>,
    router_options: RouterOptions,
    router: Option<Arc<dyn Router>>,
}

impl ClusterClient {
    /// Build a client, taking every node's pool from `registry`
    pub fn build(name: Option<&str>, config: &ClusterConfig, registry: &PoolRegistry) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(RegistryError::InvalidConfiguration(format!(
                "cluster {} has no hosts",
                name.unwrap_or("<inline>")
            )));
        }

        let mut hosts = BTreeMap::new();
        let mut pools = BTreeMap::new();
        for (id, options) in config.node_options() {
            let pool = registry.get_or_create(&options)?;
            hosts.insert(
                id.clone(),
                HostInfo {
                    id: id.clone(),
                    key: pool.key().clone(),
                },
            );
            pools.insert(id, pool);
        }

        debug!(
            "Built cluster {} with {} nodes",
            name.unwrap_or("<inline>"),
            hosts.len()
        );

        Ok(Self {
            name: name.map(str::to_string),
            hosts,
            pools,
            router_options: config.router_options.clone(),
            router: None,
        })
    }

    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Name the client was resolved under, `None` for inline construction
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostInfo> {
        self.hosts.values()
    }

    pub fn host(&self, id: &str) -> Option<&HostInfo> {
        self.hosts.get(id)
    }

    pub fn pool(&self, id: &str) -> Option<&Arc<Pool>> {
        self.pools.get(id)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Check out a connection to one node
    pub fn connection(&self, id: &str) -> Result<PooledConnection<'_>> {
        let pool = self
            .pools
            .get(id)
            .ok_or_else(|| RegistryError::UnknownNode(id.to_string()))?;
        Ok(pool.get()?)
    }

    /// Node owning every one of `keys`, as decided by the router
    ///
    /// Fails with `Unroutable` when there is no router, no key, a key the
    /// router cannot place, or keys that land on different nodes.
    pub fn node_for_keys<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<NodeId> {
        let router = self.router.as_ref().ok_or_else(|| {
            RegistryError::Unroutable(format!(
                "cluster {} has no router",
                self.name.as_deref().unwrap_or("<inline>")
            ))
        })?;
        let nodes: Vec<NodeId> = self.hosts.keys().cloned().collect();

        let mut owner: Option<NodeId> = None;
        for key in keys {
            let key = key.as_ref();
            let node = router
                .node_for_key(key, &nodes, &self.router_options)
                .ok_or_else(|| {
                    RegistryError::Unroutable(format!(
                        "no node for key {:?}",
                        String::from_utf8_lossy(key)
                    ))
                })?;
            if !self.hosts.contains_key(&node) {
                return Err(RegistryError::UnknownNode(node));
            }
            if let Some(first) = owner.as_deref().filter(|first| *first != node.as_str()) {
                return Err(RegistryError::Unroutable(format!(
                    "keys span nodes {} and {}",
                    first, node
                )));
            }
            owner.get_or_insert(node);
        }

        owner.ok_or_else(|| RegistryError::Unroutable("no keys to route by".to_string()))
    }

    /// Check out a connection to the node owning `keys`
    pub fn connection_for_keys<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<PooledConnection<'_>> {
        let node = self.node_for_keys(keys)?;
        debug!("Routed {} keys to node {}", keys.len(), node);
        self.connection(&node)
    }

    /// Run `f` on every node concurrently, one thread per node
    ///
    /// Any node failing (checkout or command) fails the whole call with a
    /// `Connectivity` error naming that node; partial results are dropped.
    pub fn run_on_all<T, F>(&self, f: F) -> Result<BTreeMap<NodeId, T>>
    where
        T: Send,
        F: Fn(&mut dyn ControlPlane) -> io::Result<T> + Sync,
    {
        let f = &f;
        let outcomes: Vec<(NodeId, Result<T>)> = std::thread::scope(|s| {
            let handles: Vec<_> = self
                .pools
                .iter()
                .map(|(id, pool)| {
                    let handle = s.spawn(move || -> Result<T> {
                        let host = &self.hosts[id];
                        let mut conn = pool.get().map_err(|e| connectivity(host, e))?;
                        f(&mut conn).map_err(|e| connectivity(host, e))
                    });
                    (id.clone(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(id, handle)| {
                    let outcome = handle.join().unwrap_or_else(|_| {
                        Err(RegistryError::Connectivity {
                            node: id.clone(),
                            message: "worker thread panicked".to_string(),
                        })
                    });
                    (id, outcome)
                })
                .collect()
        });

        outcomes
            .into_iter()
            .map(|(id, outcome)| outcome.map(|value| (id, value)))
            .collect()
    }
}

impl fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterClient")
            .field("name", &self.name)
            .field("hosts", &self.hosts)
            .field("routed", &self.router.is_some())
            .finish()
    }
}

fn connectivity(host: &HostInfo, err: impl std::fmt::Display) -> RegistryError {
    RegistryError::Connectivity {
        node: host.address(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ControlPlaneExt;
    use crate::config::Hosts;
    use crate::pool::EndpointOptions;
    use crate::testing::{MockServer, PrefixRouter};
    use serde_json::json;

    fn two_node_config() -> ClusterConfig {
        ClusterConfig::new(Hosts::List(vec![
            EndpointOptions::tcp("a", 1),
            EndpointOptions::tcp("b", 1),
        ]))
    }

    #[test]
    fn test_build_uses_registry_pools() {
        let registry = PoolRegistry::new(MockServer::new().connector());
        let client = ClusterClient::build(Some("default"), &two_node_config(), &registry).unwrap();

        assert_eq!(client.len(), 2);
        assert_eq!(client.name(), Some("default"));
        assert_eq!(client.host("0").unwrap().address(), "a:1");
        let key = client.host("1").unwrap().key.clone();
        assert!(Arc::ptr_eq(client.pool("1").unwrap(), &registry.get(&key).unwrap()));
    }

    #[test]
    fn test_empty_cluster_rejected() {
        let registry = PoolRegistry::new(MockServer::new().connector());
        let config = ClusterConfig::new(Hosts::List(Vec::new()));
        assert!(matches!(
            ClusterClient::build(None, &config, &registry),
            Err(RegistryError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_connection_to_unknown_node() {
        let registry = PoolRegistry::new(MockServer::new().connector());
        let client = ClusterClient::build(None, &two_node_config(), &registry).unwrap();
        assert!(matches!(
            client.connection("7"),
            Err(RegistryError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_run_on_all_reaches_every_node() {
        let server = MockServer::new();
        let registry = PoolRegistry::new(server.connector());
        let client = ClusterClient::build(None, &two_node_config(), &registry).unwrap();

        let results = client.run_on_all(|conn| conn.ping()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|pong| *pong));

        let mut endpoints = server.endpoints_for("PING");
        endpoints.sort();
        assert_eq!(endpoints, vec!["a:1/0", "b:1/0"]);
    }

    #[test]
    fn test_run_on_all_aborts_on_unreachable_node() {
        let server = MockServer::new();
        server.set_unreachable("b:1");
        let registry = PoolRegistry::new(server.connector());
        let client = ClusterClient::build(None, &two_node_config(), &registry).unwrap();

        match client.run_on_all(|conn| conn.ping()) {
            Err(RegistryError::Connectivity { node, .. }) => assert_eq!(node, "b:1"),
            other => panic!("expected connectivity failure, got {:?}", other.map(|r| r.len())),
        }
    }

    fn routed_cluster(registry: &PoolRegistry) -> ClusterClient {
        let mut config = two_node_config();
        config.router_options = json!({"prefixes": {"u": "0", "s": "1"}})
            .as_object()
            .cloned()
            .unwrap();
        ClusterClient::build(Some("default"), &config, registry)
            .unwrap()
            .with_router(Arc::new(PrefixRouter))
    }

    #[test]
    fn test_keys_route_to_owning_node() {
        let server = MockServer::new();
        let registry = PoolRegistry::new(server.connector());
        let client = routed_cluster(&registry);

        assert_eq!(client.node_for_keys(&["user:1"]).unwrap(), "0");
        assert_eq!(client.node_for_keys(&["session:9", "s:2"]).unwrap(), "1");

        assert!(client.connection_for_keys(&["session:9"]).unwrap().ping().unwrap());
        assert_eq!(server.endpoints_for("PING"), vec!["b:1/0"]);
    }

    #[test]
    fn test_unroutable_keys() {
        let registry = PoolRegistry::new(MockServer::new().connector());
        let client = routed_cluster(&registry);

        for keys in [vec!["user:1", "session:1"], vec!["other"], Vec::new()] {
            assert!(matches!(
                client.node_for_keys(&keys),
                Err(RegistryError::Unroutable(_))
            ));
        }

        let unrouted = ClusterClient::build(None, &two_node_config(), &registry).unwrap();
        assert!(matches!(
            unrouted.node_for_keys(&["user:1"]),
            Err(RegistryError::Unroutable(_))
        ));
    }
}
