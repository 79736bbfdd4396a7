//! Process-wide registry of shared connection pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::connection_pool::Pool;
use super::endpoint::{EndpointKey, EndpointOptions};
use crate::client::Connector;
use crate::utils::Result;

/// Maps each physical endpoint to exactly one shared `Pool`
///
/// Lookups take a shared read lock only. A miss serializes on a single
/// construction lock and re-checks the map before building, so a key is
/// constructed at most once even when many threads miss together. Pools
/// are never evicted.
pub struct PoolRegistry {
    connector: Arc<dyn Connector>,
    pools: RwLock<HashMap<EndpointKey, Arc<Pool>>>,
    create_lock: Mutex<()>,
    created: AtomicUsize,
}

impl PoolRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            pools: RwLock::new(HashMap::new()),
            create_lock: Mutex::new(()),
            created: AtomicUsize::new(0),
        }
    }

    /// Get the pool for the endpoint described by `options`, creating it on
    /// first use
    ///
    /// A failed construction caches nothing; the next call tries again.
    pub fn get_or_create(&self, options: &EndpointOptions) -> Result<Arc<Pool>> {
        let key = options.key()?;

        if let Some(pool) = self.lookup(&key) {
            return Ok(pool);
        }

        let _guard = self.create_lock.lock();
        if let Some(pool) = self.lookup(&key) {
            return Ok(pool);
        }

        let pool = Arc::new(Pool::new(options.clone(), Arc::clone(&self.connector))?);
        self.pools.write().insert(key, Arc::clone(&pool));
        let total = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Registered pool {} ({} pools total)", pool.key(), total);

        Ok(pool)
    }

    /// Look up an existing pool without creating one
    pub fn get(&self, key: &EndpointKey) -> Option<Arc<Pool>> {
        self.lookup(key)
    }

    fn lookup(&self, key: &EndpointKey) -> Option<Arc<Pool>> {
        self.pools.read().get(key).cloned()
    }

    /// Number of pools constructed over the registry's lifetime
    pub fn pools_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }
}
