//! Cluster configuration
//!
//! `ClusterConfig` describes one named cluster; a `ConfigProvider` supplies
//! the map of names to definitions.

pub mod cluster_config;
pub mod provider;

pub use cluster_config::{ClusterConfig, Hosts, NodeId};
pub use provider::{ConfigProvider, FileConfigProvider, StaticConfigProvider};
