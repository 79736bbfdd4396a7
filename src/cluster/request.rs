//! How a caller asks for a cluster

use serde_json::{Map, Value};

use crate::config::ClusterConfig;
use crate::utils::{RegistryError, Result};

/// Backend option map that may carry cluster options
pub type BackendOptions = Map<String, Value>;

/// Option name that selects a named cluster
pub const CLUSTER_OPTION: &str = "cluster";

/// Option names that construct a cluster inline (deprecated)
pub const CLUSTER_CONSTRUCTOR_OPTIONS: [&str; 4] =
    ["hosts", "host_defaults", "pool_options", "router_options"];

/// A cluster resolution request
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterRequest {
    /// Look the cluster up by name, falling back to `"default"`
    ByName(String),
    /// Build an unnamed, uncached cluster from inline options (deprecated)
    ByInlineConfig(ClusterConfig),
}

impl ClusterRequest {
    /// Split a backend's options into a cluster request and the rest
    ///
    /// Naming a cluster and passing constructor options together is a
    /// `ConfigurationConflict`; that check runs before anything is parsed or
    /// built. With neither present the request is for `default_name`.
    pub fn from_options(
        options: &BackendOptions,
        cluster_option: &str,
        default_name: &str,
    ) -> Result<(ClusterRequest, BackendOptions)> {
        let inline: Vec<String> = CLUSTER_CONSTRUCTOR_OPTIONS
            .iter()
            .filter(|name| options.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        if !inline.is_empty() && options.contains_key(cluster_option) {
            return Err(RegistryError::ConfigurationConflict {
                named: cluster_option.to_string(),
                inline,
            });
        }

        let mut rest = options.clone();

        if !inline.is_empty() {
            let cluster_options: Map<String, Value> = inline
                .iter()
                .filter_map(|name| rest.remove(name).map(|v| (name.clone(), v)))
                .collect();
            let config = ClusterConfig::from_value(Value::Object(cluster_options))?;
            return Ok((ClusterRequest::ByInlineConfig(config), rest));
        }

        let name = match rest.remove(cluster_option) {
            None | Some(Value::Null) => default_name.to_string(),
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(RegistryError::InvalidConfiguration(format!(
                    "option {:?} must be a cluster name, got {}",
                    cluster_option, other
                )))
            }
        };

        Ok((ClusterRequest::ByName(name), rest))
    }
}
