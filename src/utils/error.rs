//! Error types for valkey-cluster-pools

use std::io;
use thiserror::Error;

use crate::version::Version;

/// Top-level error for pool, cluster, script and version operations
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid configuration: no cluster named {name:?} and no \"default\" cluster to fall back to")]
    ConfigurationMissing { name: String },

    #[error("Invalid configuration: cannot provide both named cluster ({named:?}) and cluster configuration ({inline:?}) options")]
    ConfigurationConflict { named: String, inline: Vec<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid endpoint options: {0}")]
    InvalidEndpoint(String),

    /// Any node unreachable while building or querying a cluster
    #[error("Invalid configuration: node {node} is unreachable: {message}")]
    Connectivity { node: String, message: String },

    #[error("{message}")]
    VersionTooLow {
        service: String,
        required: Version,
        hosts: Vec<String>,
        message: String,
    },

    #[error("Node {0} not found in cluster")]
    UnknownNode(String),

    #[error("Cannot route: {0}")]
    Unroutable(String),

    #[error("Failed to load script {path}: {source}")]
    Script { path: String, source: io::Error },

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Transport failure while running a command, passed through as-is
    #[error(transparent)]
    Transport(#[from] io::Error),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {endpoint}: {source}")]
    ConnectFailed { endpoint: String, source: io::Error },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("SELECT {db} failed on {endpoint}: {message}")]
    SelectFailed {
        endpoint: String,
        db: u32,
        message: String,
    },

    #[error("Pool for {endpoint} exhausted: {max} connections busy after {waited_ms}ms")]
    PoolExhausted {
        endpoint: String,
        max: usize,
        waited_ms: u64,
    },

    #[error("Unsupported endpoint: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
