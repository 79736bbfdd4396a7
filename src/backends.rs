//! Process-wide handle over pools, clusters, scripts and version checks
//!
//! Build one `Backends` at startup and share it (it is `Send + Sync`).
//! Everything behind it is created lazily on first request.

use std::sync::Arc;

use tracing::info;

use crate::client::{Connector, RawConnector};
use crate::cluster::{BackendOptions, ClusterClient, ClusterManager, Router};
use crate::config::ConfigProvider;
use crate::pool::{EndpointOptions, Pool, PoolRegistry};
use crate::script::{LoadedScript, ScriptSource};
use crate::utils::Result;
use crate::version::{self, Version, VersionWarning};

pub struct Backends {
    pools: Arc<PoolRegistry>,
    clusters: ClusterManager,
    scripts: Arc<dyn ScriptSource>,
}

impl Backends {
    /// Real network connections
    pub fn new(provider: Arc<dyn ConfigProvider>, scripts: Arc<dyn ScriptSource>) -> Self {
        Self::with_connector(provider, scripts, Arc::new(RawConnector))
    }

    pub fn with_connector(
        provider: Arc<dyn ConfigProvider>,
        scripts: Arc<dyn ScriptSource>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let pools = Arc::new(PoolRegistry::new(connector));
        info!("Backends initialized");
        Self {
            clusters: ClusterManager::new(provider, Arc::clone(&pools)),
            pools,
            scripts,
        }
    }

    /// Route keys on every cluster through `router`
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.clusters = self.clusters.with_router(router);
        self
    }

    /// Shared pool for one endpoint
    pub fn get_pool(&self, options: &EndpointOptions) -> Result<Arc<Pool>> {
        self.pools.get_or_create(options)
    }

    /// Named cluster, or the default one when `name` is not configured
    pub fn get_cluster(&self, name: &str) -> Result<Arc<ClusterClient>> {
        self.clusters.get(name)
    }

    /// Cluster selected by a backend's options, plus the remaining options
    pub fn get_cluster_from_options(
        &self,
        backend: &str,
        options: &BackendOptions,
    ) -> Result<(Arc<ClusterClient>, BackendOptions)> {
        self.clusters.from_options(backend, options)
    }

    pub fn load_script(&self, relative_path: &str) -> Result<LoadedScript> {
        LoadedScript::load(self.scripts.as_ref(), relative_path)
    }

    pub fn check_cluster_versions(
        &self,
        cluster: &ClusterClient,
        required: Version,
        recommended: Option<Version>,
        label: Option<&str>,
    ) -> Result<Option<VersionWarning>> {
        version::check_cluster_versions(cluster, required, recommended, label)
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn clusters(&self) -> &ClusterManager {
        &self.clusters
    }
}
