//! Sources of named cluster configuration

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::cluster_config::ClusterConfig;
use crate::utils::{RegistryError, Result};

/// Supplies the current set of named cluster definitions
///
/// The cluster manager reads a name from here once, the first time that
/// name is requested.
pub trait ConfigProvider: Send + Sync {
    fn named_cluster_configs(&self) -> Result<HashMap<String, ClusterConfig>>;
}

/// Fixed, in-memory cluster definitions
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    clusters: HashMap<String, ClusterConfig>,
}

impl StaticConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, name: &str, config: ClusterConfig) -> Self {
        self.clusters.insert(name.to_string(), config);
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: ClustersFile = serde_json::from_str(text)
            .map_err(|e| RegistryError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            clusters: file.clusters,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: ClustersFile = serde_yaml::from_str(text)
            .map_err(|e| RegistryError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            clusters: file.clusters,
        })
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn named_cluster_configs(&self) -> Result<HashMap<String, ClusterConfig>> {
        Ok(self.clusters.clone())
    }
}

/// Cluster definitions read from a JSON or YAML file on every call
///
/// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
/// The file holds a top-level `clusters` map.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
    }
}

impl ConfigProvider for FileConfigProvider {
    fn named_cluster_configs(&self) -> Result<HashMap<String, ClusterConfig>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            RegistryError::InvalidConfiguration(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let provider = if self.is_yaml() {
            StaticConfigProvider::from_yaml_str(&text)
        } else {
            StaticConfigProvider::from_json_str(&text)
        }
        .map_err(|e| {
            RegistryError::InvalidConfiguration(format!("{}: {}", self.path.display(), e))
        })?;

        Ok(provider.clusters)
    }
}

#[derive(Deserialize)]
struct ClustersFile {
    #[serde(default)]
    clusters: HashMap<String, ClusterConfig>,
}
