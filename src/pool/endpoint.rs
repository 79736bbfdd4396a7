//! Endpoint options and the identity key derived from them

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::{RegistryError, Result};

pub const DEFAULT_PORT: u16 = 6379;

/// Sizing and timeout options for a pool
///
/// These never take part in pool identity: two requests differing only here
/// share one pool and the first caller's settings win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    pub max_connections: usize,
    /// Must be non-zero
    pub connect_timeout_ms: u64,
    /// Read/write timeout on established sockets, 0 disables it
    pub socket_timeout_ms: u64,
    /// How long a checkout waits for a busy pool
    pub pool_timeout_ms: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 64,
            connect_timeout_ms: 5_000,
            socket_timeout_ms: 30_000,
            pool_timeout_ms: 5_000,
        }
    }
}

/// Options describing one physical endpoint
///
/// Identity fields are optional so host entries can be merged over a
/// cluster's `host_defaults`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<PathBuf>,
    pub db: Option<u32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool: PoolOptions,
}

impl EndpointOptions {
    pub fn tcp(host: &str, port: u16) -> Self {
        Self {
            host: Some(host.to_string()),
            port: Some(port),
            ..Self::default()
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = Some(db);
        self
    }

    /// Fill every unset field from `defaults`
    ///
    /// A host entry that names its own `path` does not inherit a default
    /// `host` (and vice versa), so one kind of address never leaks into the
    /// other.
    pub fn with_defaults(&self, defaults: &EndpointOptions) -> EndpointOptions {
        let own_address = self.host.is_some() || self.path.is_some();
        EndpointOptions {
            host: self
                .host
                .clone()
                .or_else(|| (!own_address).then(|| defaults.host.clone()).flatten()),
            port: self.port.or(defaults.port),
            path: self
                .path
                .clone()
                .or_else(|| (!own_address).then(|| defaults.path.clone()).flatten()),
            db: self.db.or(defaults.db),
            username: self.username.clone().or_else(|| defaults.username.clone()),
            password: self.password.clone().or_else(|| defaults.password.clone()),
            pool: self.pool.clone(),
        }
    }

    /// Derive the identity key
    ///
    /// `host` wins over `path` when both are set.
    pub fn key(&self) -> Result<EndpointKey> {
        let db = self.db.unwrap_or(0);

        if let Some(ref host) = self.host {
            if host.is_empty() {
                return Err(RegistryError::InvalidEndpoint("empty host".to_string()));
            }
            let port = self.port.unwrap_or(DEFAULT_PORT);
            if port == 0 {
                return Err(RegistryError::InvalidEndpoint(format!(
                    "port 0 for host {}",
                    host
                )));
            }
            return Ok(EndpointKey::Tcp {
                host: host.clone(),
                port,
                db,
            });
        }

        match self.path {
            Some(ref path) if path.as_os_str().is_empty() => {
                Err(RegistryError::InvalidEndpoint("empty socket path".to_string()))
            }
            Some(ref path) => Ok(EndpointKey::Unix {
                path: path.clone(),
                db,
            }),
            None => Err(RegistryError::InvalidEndpoint(
                "neither host nor path given".to_string(),
            )),
        }
    }
}

/// Physical identity of an endpoint: one pool exists per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointKey {
    Tcp { host: String, port: u16, db: u32 },
    Unix { path: PathBuf, db: u32 },
}

impl EndpointKey {
    pub fn db(&self) -> u32 {
        match self {
            EndpointKey::Tcp { db, .. } | EndpointKey::Unix { db, .. } => *db,
        }
    }

    /// `host:port` for TCP, the socket path otherwise
    pub fn address(&self) -> String {
        match self {
            EndpointKey::Tcp { host, port, .. } => format!("{}:{}", host, port),
            EndpointKey::Unix { path, .. } => path.display().to_string(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.db())
    }
}
