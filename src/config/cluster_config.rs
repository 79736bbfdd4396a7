//! Named cluster definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pool::{EndpointOptions, PoolOptions};
use crate::utils::{RegistryError, Result};

/// Node identifier inside a cluster definition
pub type NodeId = String;

/// Host list as written in configuration
///
/// A plain list numbers its nodes `"0"`, `"1"`, ... in order; a map keeps
/// the ids it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hosts {
    List(Vec<EndpointOptions>),
    Map(BTreeMap<NodeId, EndpointOptions>),
}

impl Hosts {
    pub fn into_map(self) -> BTreeMap<NodeId, EndpointOptions> {
        match self {
            Hosts::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(idx, opts)| (idx.to_string(), opts))
                .collect(),
            Hosts::Map(map) => map,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Hosts::List(list) => list.len(),
            Hosts::Map(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything needed to build one cluster client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub hosts: Hosts,
    #[serde(default)]
    pub host_defaults: EndpointOptions,
    /// Sizes every node pool; a `pool` block inside `hosts` or
    /// `host_defaults` is ignored
    #[serde(default)]
    pub pool_options: PoolOptions,
    /// Passed through to the routing component untouched
    #[serde(default)]
    pub router_options: serde_json::Map<String, serde_json::Value>,
}

impl ClusterConfig {
    pub fn new(hosts: Hosts) -> Self {
        Self {
            hosts,
            host_defaults: EndpointOptions::default(),
            pool_options: PoolOptions::default(),
            router_options: serde_json::Map::new(),
        }
    }

    /// Parse an inline option map (the deprecated construction path)
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| RegistryError::InvalidConfiguration(format!("cluster options: {}", e)))
    }

    /// Fully resolved per-node endpoint options
    ///
    /// Each host is merged over `host_defaults`. The cluster's
    /// `pool_options` then replace whatever `pool` either of them carried.
    pub fn node_options(&self) -> BTreeMap<NodeId, EndpointOptions> {
        self.hosts
            .clone()
            .into_map()
            .into_iter()
            .map(|(id, host)| {
                let mut merged = host.with_defaults(&self.host_defaults);
                merged.pool = self.pool_options.clone();
                (id, merged)
            })
            .collect()
    }
}
