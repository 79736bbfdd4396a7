//! Minimum and recommended version policy

use std::collections::BTreeMap;

use super::number::Version;
use crate::utils::{RegistryError, Result};

/// Hosts named in a message before the rest are counted
const MAX_LISTED_HOSTS: usize = 3;

/// Node address to the version it reported
pub type VersionReport = BTreeMap<String, Version>;

/// Non-fatal result: some hosts are below the recommended version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionWarning {
    pub service: String,
    pub recommended: Version,
    pub hosts: Vec<String>,
    pub message: String,
}

/// Decides whether a fleet's versions are acceptable
pub trait VersionPolicy: Send + Sync {
    /// `Err` is fatal; `Ok(Some(_))` is a warning the caller should surface
    fn check(
        &self,
        service: &str,
        versions: &VersionReport,
        required: Version,
        recommended: Option<Version>,
    ) -> Result<Option<VersionWarning>>;
}

/// Fails on any host below `required`, warns on any below `recommended`
#[derive(Debug, Clone, Copy, Default)]
pub struct UpgradePolicy;

impl VersionPolicy for UpgradePolicy {
    fn check(
        &self,
        service: &str,
        versions: &VersionReport,
        required: Version,
        recommended: Option<Version>,
    ) -> Result<Option<VersionWarning>> {
        let below_required = hosts_below(versions, required);
        if !below_required.is_empty() {
            let message = upgrade_message(service, "must", required, &below_required);
            return Err(RegistryError::VersionTooLow {
                service: service.to_string(),
                required,
                hosts: below_required,
                message,
            });
        }

        let Some(recommended) = recommended else {
            return Ok(None);
        };
        let below_recommended = hosts_below(versions, recommended);
        if below_recommended.is_empty() {
            return Ok(None);
        }

        Ok(Some(VersionWarning {
            service: service.to_string(),
            recommended,
            message: upgrade_message(service, "should", recommended, &below_recommended),
            hosts: below_recommended,
        }))
    }
}

fn hosts_below(versions: &VersionReport, threshold: Version) -> Vec<String> {
    versions
        .iter()
        .filter(|(_, version)| **version < threshold)
        .map(|(host, _)| host.clone())
        .collect()
}

fn upgrade_message(service: &str, verb: &str, version: Version, hosts: &[String]) -> String {
    format!(
        "{} {} be upgraded to {} on {}.",
        service,
        verb,
        version,
        summarize_hosts(hosts)
    )
}

/// `"a, b, c"` or `"a, b, c and 4 more"`
pub fn summarize_hosts(hosts: &[String]) -> String {
    let listed = hosts[..hosts.len().min(MAX_LISTED_HOSTS)].join(", ");
    match hosts.len().saturating_sub(MAX_LISTED_HOSTS) {
        0 => listed,
        rest => format!("{} and {} more", listed, rest),
    }
}
