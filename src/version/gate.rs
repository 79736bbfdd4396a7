//! Fleet-wide version check

use tracing::{debug, warn};

use super::number::Version;
use super::policy::{UpgradePolicy, VersionPolicy, VersionReport, VersionWarning};
use crate::client::ControlPlaneExt;
use crate::cluster::ClusterClient;
use crate::utils::{parse_info, RegistryError, Result};

/// Recommended version when the caller does not name one
pub const DEFAULT_RECOMMENDED: Version = Version::new(3, 0, 4);

const VERSION_FIELDS: [&str; 2] = ["redis_version", "valkey_version"];

/// Ask every node of `cluster` for its version
///
/// One unreachable node fails the whole collection. Reports are keyed by
/// `host:port` (or socket path).
pub fn collect_versions(cluster: &ClusterClient) -> Result<VersionReport> {
    let infos = cluster.run_on_all(|conn| conn.info("server"))?;

    let mut versions = VersionReport::new();
    for (id, text) in infos {
        let address = cluster
            .host(&id)
            .map(|host| host.address())
            .ok_or_else(|| RegistryError::UnknownNode(id.clone()))?;

        let info = parse_info(&text);
        let raw = VERSION_FIELDS
            .iter()
            .find_map(|field| info.get(field))
            .ok_or_else(|| {
                RegistryError::InvalidConfiguration(format!(
                    "node {} did not report a server version",
                    address
                ))
            })?;
        let version = raw.parse::<Version>().map_err(|e| {
            RegistryError::InvalidConfiguration(format!("node {}: {}", address, e))
        })?;

        debug!("Node {} reports version {}", address, version);
        versions.insert(address, version);
    }
    Ok(versions)
}

/// Checks a cluster's versions against a policy
pub struct VersionGate {
    policy: Box<dyn VersionPolicy>,
}

impl Default for VersionGate {
    fn default() -> Self {
        Self::new(Box::new(UpgradePolicy))
    }
}

impl VersionGate {
    pub fn new(policy: Box<dyn VersionPolicy>) -> Self {
        Self { policy }
    }

    /// Collect versions and apply the policy
    ///
    /// A host below `required` is an error. A host below `recommended` is
    /// logged and returned as a warning.
    pub fn check(
        &self,
        cluster: &ClusterClient,
        required: Version,
        recommended: Option<Version>,
        label: Option<&str>,
    ) -> Result<Option<VersionWarning>> {
        let versions = collect_versions(cluster)?;
        let service = match label {
            Some(label) => format!("Redis ({})", label),
            None => "Redis".to_string(),
        };

        let warning = self.policy.check(&service, &versions, required, recommended)?;
        if let Some(warning) = &warning {
            warn!("{}", warning.message);
        }
        Ok(warning)
    }
}

/// `VersionGate` with the upgrade policy, recommending 3.0.4 by default
pub fn check_cluster_versions(
    cluster: &ClusterClient,
    required: Version,
    recommended: Option<Version>,
    label: Option<&str>,
) -> Result<Option<VersionWarning>> {
    VersionGate::default().check(
        cluster,
        required,
        Some(recommended.unwrap_or(DEFAULT_RECOMMENDED)),
        label,
    )
}
