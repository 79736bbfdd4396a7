//! valkey-cluster-pools library
//!
//! Shared, deduplicated connection pools and named cluster resolution for
//! Valkey/Redis, plus explicit-target script invocation and a fleet version
//! gate. `Backends` ties the pieces together behind one handle.

pub mod backends;
pub mod client;
pub mod cluster;
pub mod config;
pub mod pool;
pub mod script;
pub mod utils;
pub mod version;

#[cfg(test)]
mod testing;

pub use backends::Backends;
