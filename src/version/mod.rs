//! Server version checks
//!
//! `VersionGate` fans INFO out to every node of a cluster and hands the
//! results to a `VersionPolicy`.

pub mod gate;
pub mod number;
pub mod policy;

pub use gate::{check_cluster_versions, collect_versions, VersionGate, DEFAULT_RECOMMENDED};
pub use number::{ParseVersionError, Version};
pub use policy::{summarize_hosts, UpgradePolicy, VersionPolicy, VersionReport, VersionWarning};
