//! Named clusters
//!
//! - `ClusterClient`: nodes of one cluster, each on a shared pool
//! - `ClusterRequest`: by-name or (deprecated) inline resolution
//! - `ClusterManager`: one client per name for the life of the process
//! - `Router`: external key-to-node placement

pub mod client;
pub mod manager;
pub mod request;
pub mod router;

pub use client::{ClusterClient, HostInfo};
pub use manager::{ClusterManager, DEFAULT_CLUSTER};
pub use request::{BackendOptions, ClusterRequest, CLUSTER_CONSTRUCTOR_OPTIONS, CLUSTER_OPTION};
pub use router::{Router, RouterOptions};
