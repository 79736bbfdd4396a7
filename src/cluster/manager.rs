//! Named cluster cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::client::ClusterClient;
use super::request::{BackendOptions, ClusterRequest, CLUSTER_OPTION};
use super::router::Router;
use crate::config::{ClusterConfig, ConfigProvider};
use crate::pool::PoolRegistry;
use crate::utils::{RegistryError, Result};

/// Reserved name every unknown cluster falls back to
pub const DEFAULT_CLUSTER: &str = "default";

/// Resolves cluster names to shared `ClusterClient`s
///
/// Construction happens under a single lock with a re-check, so each name
/// is built at most once even when first requested from many threads at
/// once. A name with no configuration of its own is cached as an alias of
/// the `"default"` client.
pub struct ClusterManager {
    provider: Arc<dyn ConfigProvider>,
    pools: Arc<PoolRegistry>,
    clusters: RwLock<HashMap<String, Arc<ClusterClient>>>,
    build_lock: Mutex<()>,
    built: AtomicUsize,
    router: Option<Arc<dyn Router>>,
}

impl ClusterManager {
    pub fn new(provider: Arc<dyn ConfigProvider>, pools: Arc<PoolRegistry>) -> Self {
        Self {
            provider,
            pools,
            clusters: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
            built: AtomicUsize::new(0),
            router: None,
        }
    }

    /// Attach `router` to every client this manager builds
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn pools(&self) -> &Arc<PoolRegistry> {
        &self.pools
    }

    /// Get the client for `name`, building it on first use
    pub fn get(&self, name: &str) -> Result<Arc<ClusterClient>> {
        if let Some(cluster) = self.cached(name) {
            return Ok(cluster);
        }

        let _guard = self.build_lock.lock();
        self.get_locked(name)
    }

    /// Resolve a request; inline configurations bypass the cache
    pub fn resolve(&self, request: ClusterRequest) -> Result<Arc<ClusterClient>> {
        self.resolve_for(request, None)
    }

    /// Resolve the cluster a backend's options ask for
    ///
    /// Returns the client and the options left after removing the cluster
    /// ones. `backend` only labels the deprecation warning.
    pub fn from_options(
        &self,
        backend: &str,
        options: &BackendOptions,
    ) -> Result<(Arc<ClusterClient>, BackendOptions)> {
        let (request, rest) =
            ClusterRequest::from_options(options, CLUSTER_OPTION, DEFAULT_CLUSTER)?;
        Ok((self.resolve_for(request, Some(backend))?, rest))
    }

    /// Number of `ClusterClient`s constructed, including uncached inline ones
    pub fn clusters_built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    /// Names currently cached, sorted
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.clusters.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve_for(
        &self,
        request: ClusterRequest,
        backend: Option<&str>,
    ) -> Result<Arc<ClusterClient>> {
        let config = match request {
            ClusterRequest::ByName(name) => return self.get(&name),
            ClusterRequest::ByInlineConfig(config) => config,
        };

        match backend {
            Some(backend) => warn!(
                "Providing cluster configuration options to {} is deprecated, please use named clusters ({:?})",
                backend, CLUSTER_OPTION
            ),
            None => warn!("Direct cluster construction is deprecated, please use named clusters"),
        }
        Ok(Arc::new(self.build(None, &config)?))
    }

    fn build(&self, name: Option<&str>, config: &ClusterConfig) -> Result<ClusterClient> {
        let mut cluster = ClusterClient::build(name, config, &self.pools)?;
        if let Some(ref router) = self.router {
            cluster = cluster.with_router(Arc::clone(router));
        }
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(cluster)
    }

    fn cached(&self, name: &str) -> Option<Arc<ClusterClient>> {
        self.clusters.read().get(name).cloned()
    }

    // Caller holds `build_lock`.
    fn get_locked(&self, name: &str) -> Result<Arc<ClusterClient>> {
        if let Some(cluster) = self.cached(name) {
            return Ok(cluster);
        }

        let mut configs = self.provider.named_cluster_configs()?;
        let cluster = match configs.remove(name) {
            Some(config) => {
                let cluster = Arc::new(self.build(Some(name), &config)?);
                info!("Cluster {} ready with {} nodes", name, cluster.len());
                cluster
            }
            None if name != DEFAULT_CLUSTER => {
                if !configs.contains_key(DEFAULT_CLUSTER) {
                    return Err(RegistryError::ConfigurationMissing {
                        name: name.to_string(),
                    });
                }
                warn!(
                    "No configuration for cluster {:?}, falling back to {:?}",
                    name, DEFAULT_CLUSTER
                );
                self.get_locked(DEFAULT_CLUSTER)?
            }
            None => {
                return Err(RegistryError::ConfigurationMissing {
                    name: name.to_string(),
                })
            }
        };

        self.clusters
            .write()
            .insert(name.to_string(), Arc::clone(&cluster));
        Ok(cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Hosts, StaticConfigProvider};
    use crate::pool::EndpointOptions;
    use crate::testing::{MockServer, PrefixRouter};
    use serde_json::json;
    use std::sync::Barrier;

    fn config(hosts: &[(&str, u16)]) -> ClusterConfig {
        ClusterConfig::new(Hosts::List(
            hosts
                .iter()
                .map(|(h, p)| EndpointOptions::tcp(h, *p))
                .collect(),
        ))
    }

    fn manager(provider: StaticConfigProvider) -> ClusterManager {
        let pools = Arc::new(PoolRegistry::new(MockServer::new().connector()));
        ClusterManager::new(Arc::new(provider), pools)
    }

    #[test]
    fn test_same_name_same_client() {
        let manager = manager(StaticConfigProvider::new().with_cluster("default", config(&[("a", 1)])));

        let first = manager.get("default").unwrap();
        let second = manager.get("default").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.clusters_built(), 1);
    }

    #[test]
    fn test_unknown_name_falls_back_to_default() {
        let manager = manager(StaticConfigProvider::new().with_cluster("default", config(&[("a", 1)])));

        let fallback = manager.get("unknown-name").unwrap();
        let default = manager.get("default").unwrap();
        assert!(Arc::ptr_eq(&fallback, &default));
        assert_eq!(fallback.name(), Some("default"));
        assert_eq!(manager.clusters_built(), 1);
        assert_eq!(manager.cached_names(), vec!["default", "unknown-name"]);
    }

    #[test]
    fn test_missing_default_is_configuration_missing() {
        let manager = manager(StaticConfigProvider::new().with_cluster("metrics", config(&[("a", 1)])));

        match manager.get("unknown-name") {
            Err(RegistryError::ConfigurationMissing { name }) => assert_eq!(name, "unknown-name"),
            other => panic!("expected ConfigurationMissing, got {:?}", other.map(|c| c.len())),
        }
        assert!(matches!(
            manager.get(DEFAULT_CLUSTER),
            Err(RegistryError::ConfigurationMissing { .. })
        ));
    }

    #[test]
    fn test_clusters_share_pools_for_same_node() {
        let manager = manager(
            StaticConfigProvider::new()
                .with_cluster("default", config(&[("host", 6379), ("other", 6379)]))
                .with_cluster("metrics", config(&[("host", 6379)])),
        );

        let default = manager.get("default").unwrap();
        let metrics = manager.get("metrics").unwrap();
        assert!(!Arc::ptr_eq(&default, &metrics));
        assert!(Arc::ptr_eq(
            default.pool("0").unwrap(),
            metrics.pool("0").unwrap()
        ));
        assert_eq!(manager.pools().pools_created(), 2);
    }

    #[test]
    fn test_concurrent_first_get_builds_once() {
        const THREADS: usize = 50;
        let manager = manager(StaticConfigProvider::new().with_cluster("default", config(&[("a", 1), ("b", 1)])));
        let barrier = Barrier::new(THREADS);

        let clients: Vec<Arc<ClusterClient>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        manager.get("default").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(manager.clusters_built(), 1);
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
    }

    #[test]
    fn test_failed_build_is_retried() {
        let manager = manager(
            StaticConfigProvider::new().with_cluster("default", ClusterConfig::new(Hosts::List(Vec::new()))),
        );
        assert!(manager.get("default").is_err());
        assert!(manager.get("default").is_err());
        assert!(manager.cached_names().is_empty());
    }

    #[test]
    fn test_inline_config_bypasses_cache() {
        let manager = manager(StaticConfigProvider::new().with_cluster("default", config(&[("a", 1)])));
        let inline = json!({"hosts": [{"host": "a", "port": 1}], "ttl": 5});

        let (first, rest) = manager
            .from_options("tsdb", inline.as_object().unwrap())
            .unwrap();
        let (second, _) = manager
            .from_options("tsdb", inline.as_object().unwrap())
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), None);
        assert!(Arc::ptr_eq(first.pool("0").unwrap(), second.pool("0").unwrap()));
        assert_eq!(rest.len(), 1);
        assert!(manager.cached_names().is_empty());
    }

    #[test]
    fn test_conflicting_options_build_nothing() {
        let manager = manager(StaticConfigProvider::new().with_cluster("default", config(&[("a", 1)])));
        let options = json!({"cluster": "default", "hosts": [{"host": "a"}]});

        assert!(matches!(
            manager.from_options("tsdb", options.as_object().unwrap()),
            Err(RegistryError::ConfigurationConflict { .. })
        ));
        assert_eq!(manager.clusters_built(), 0);
        assert_eq!(manager.pools().pools_created(), 0);
    }

    #[test]
    fn test_from_options_named() {
        let manager = manager(
            StaticConfigProvider::new()
                .with_cluster("default", config(&[("a", 1)]))
                .with_cluster("metrics", config(&[("m", 1)])),
        );
        let options = json!({"cluster": "metrics"});

        let (cluster, rest) = manager
            .from_options("tsdb", options.as_object().unwrap())
            .unwrap();
        assert_eq!(cluster.name(), Some("metrics"));
        assert!(rest.is_empty());
        assert!(Arc::ptr_eq(&cluster, &manager.get("metrics").unwrap()));
    }

    #[test]
    fn test_resolve_both_request_kinds() {
        let manager = manager(StaticConfigProvider::new().with_cluster("default", config(&[("a", 1)])));

        let named = manager
            .resolve(ClusterRequest::ByName("metrics".to_string()))
            .unwrap();
        assert!(Arc::ptr_eq(&named, &manager.get("default").unwrap()));

        let inline = manager
            .resolve(ClusterRequest::ByInlineConfig(config(&[("a", 1), ("b", 1)])))
            .unwrap();
        assert_eq!(inline.name(), None);
        assert_eq!(inline.len(), 2);
        assert_eq!(manager.clusters_built(), 2);
        assert_eq!(manager.cached_names(), vec!["default", "metrics"]);
    }

    #[test]
    fn test_router_attached_to_built_clusters() {
        let mut routed = config(&[("a", 1), ("b", 1)]);
        routed.router_options = json!({"prefixes": {"x": "1"}}).as_object().cloned().unwrap();
        let manager = manager(StaticConfigProvider::new().with_cluster("default", routed.clone()))
            .with_router(Arc::new(PrefixRouter));

        let named = manager.get("default").unwrap();
        assert_eq!(named.node_for_keys(&["x:1"]).unwrap(), "1");

        let inline = manager.resolve(ClusterRequest::ByInlineConfig(routed)).unwrap();
        assert_eq!(inline.node_for_keys(&["x:2"]).unwrap(), "1");
    }
}
