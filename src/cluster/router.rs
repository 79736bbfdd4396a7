//! Key-to-node routing hook

use serde_json::{Map, Value};

use crate::config::NodeId;

/// Opaque options handed to the router, taken from `router_options`
pub type RouterOptions = Map<String, Value>;

/// Picks the node that owns a key
///
/// Sharding lives outside this crate; a cluster only asks its router and
/// never hashes keys itself. `None` means the key cannot be placed.
pub trait Router: Send + Sync {
    fn node_for_key(&self, key: &[u8], nodes: &[NodeId], options: &RouterOptions) -> Option<NodeId>;
}
