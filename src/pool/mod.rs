//! Shared connection pools
//!
//! - `EndpointOptions` / `EndpointKey`: what identifies a physical endpoint
//! - `Pool`: bounded set of live connections to one endpoint
//! - `PoolRegistry`: one pool per endpoint for the life of the process

pub mod connection_pool;
pub mod endpoint;
pub mod registry;

pub use connection_pool::{Pool, PoolStats, PooledConnection};
pub use endpoint::{EndpointKey, EndpointOptions, PoolOptions, DEFAULT_PORT};
pub use registry::PoolRegistry;
