//! Bounded pool of live connections to one endpoint

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::endpoint::{EndpointKey, EndpointOptions};
use crate::client::{BoxedConnection, Connector, ControlPlane};
use crate::utils::{ConnectionError, RegistryError, RespValue, Result};

/// Snapshot of a pool's occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub open: usize,
    pub max: usize,
}

struct PoolState {
    idle: Vec<BoxedConnection>,
    /// Idle plus checked out plus being opened
    open: usize,
}

/// Thread-safe set of connections to a single endpoint
///
/// Connections are opened lazily on checkout, at most `max_connections` at a
/// time, and go back to the idle list when their guard drops.
pub struct Pool {
    key: EndpointKey,
    options: EndpointOptions,
    connector: Arc<dyn Connector>,
    state: Mutex<PoolState>,
    returned: Condvar,
}

impl Pool {
    /// Validate options and create an empty pool; no socket is opened here
    pub fn new(options: EndpointOptions, connector: Arc<dyn Connector>) -> Result<Self> {
        let key = options.key()?;
        if options.pool.max_connections == 0 {
            return Err(RegistryError::InvalidEndpoint(format!(
                "max_connections must be at least 1 for {}",
                key
            )));
        }
        if options.pool.connect_timeout_ms == 0 {
            return Err(RegistryError::InvalidEndpoint(format!(
                "connect_timeout_ms must be at least 1 for {}",
                key
            )));
        }

        debug!(
            "Created pool for {} (max {} connections)",
            key, options.pool.max_connections
        );

        Ok(Self {
            key,
            options,
            connector,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                open: 0,
            }),
            returned: Condvar::new(),
        })
    }

    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            open: state.open,
            max: self.options.pool.max_connections,
        }
    }

    /// Check out a connection, opening one if the pool has room
    ///
    /// Waits up to `pool_timeout_ms` when every connection is busy.
    pub fn get(&self) -> std::result::Result<PooledConnection<'_>, ConnectionError> {
        let max = self.options.pool.max_connections;
        let wait = Duration::from_millis(self.options.pool.pool_timeout_ms);
        let deadline = Instant::now() + wait;

        let mut state = self.state.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection::new(self, conn));
            }

            if state.open < max {
                state.open += 1;
                drop(state);
                return match self.connector.connect(&self.key, &self.options) {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(e) => {
                        self.release_slot();
                        Err(e)
                    }
                };
            }

            if self.returned.wait_until(&mut state, deadline).timed_out() {
                return Err(ConnectionError::PoolExhausted {
                    endpoint: self.key.to_string(),
                    max,
                    waited_ms: wait.as_millis() as u64,
                });
            }
        }
    }

    fn put_back(&self, conn: BoxedConnection) {
        self.state.lock().idle.push(conn);
        self.returned.notify_one();
    }

    fn release_slot(&self) {
        {
            let mut state = self.state.lock();
            state.open = state.open.saturating_sub(1);
        }
        self.returned.notify_one();
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("key", &self.key)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Checked-out connection; returns to its pool on drop
///
/// A connection that saw a transport error is closed instead of reused.
pub struct PooledConnection<'a> {
    pool: &'a Pool,
    conn: Option<BoxedConnection>,
    broken: bool,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a Pool, conn: BoxedConnection) -> Self {
        Self {
            pool,
            conn: Some(conn),
            broken: false,
        }
    }

    fn track(&mut self, result: io::Result<RespValue>) -> io::Result<RespValue> {
        if result.is_err() {
            self.broken = true;
        }
        result
    }

    fn inner(&mut self) -> io::Result<&mut BoxedConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection released"))
    }
}

impl ControlPlane for PooledConnection<'_> {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        let result = self.inner()?.execute(args);
        self.track(result)
    }

    fn execute_binary(&mut self, args: &[&[u8]]) -> io::Result<RespValue> {
        let result = self.inner()?.execute_binary(args);
        self.track(result)
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.broken {
            warn!("Discarding broken connection to {}", self.pool.key);
            drop(conn);
            self.pool.release_slot();
        } else {
            self.pool.put_back(conn);
        }
    }
}
