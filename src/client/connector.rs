//! Opening live connections for a pool

use std::time::Duration;

use tracing::debug;

use super::control_plane::{ControlPlane, ControlPlaneExt};
use super::raw_connection::RawConnection;
use crate::pool::{EndpointKey, EndpointOptions};
use crate::utils::ConnectionError;

/// A live connection owned by a pool
pub type BoxedConnection = Box<dyn ControlPlane + Send>;

/// Opens connections for one endpoint
///
/// Pools call this lazily, outside their lock, whenever a checkout finds no
/// idle connection and the pool is under its size bound.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        key: &EndpointKey,
        options: &EndpointOptions,
    ) -> Result<BoxedConnection, ConnectionError>;
}

/// Connector that opens real sockets
///
/// After connecting it authenticates when a password is configured and
/// selects the logical database when it is not 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawConnector;

impl Connector for RawConnector {
    fn connect(
        &self,
        key: &EndpointKey,
        options: &EndpointOptions,
    ) -> Result<BoxedConnection, ConnectionError> {
        let pool = &options.pool;
        let mut conn = match key {
            EndpointKey::Tcp { host, port, .. } => RawConnection::connect_tcp(
                host,
                *port,
                Duration::from_millis(pool.connect_timeout_ms),
            )?,
            #[cfg(unix)]
            EndpointKey::Unix { path, .. } => RawConnection::connect_unix(path)?,
            #[cfg(not(unix))]
            EndpointKey::Unix { .. } => {
                return Err(ConnectionError::Unsupported(format!(
                    "{}: Unix sockets are not available on this platform",
                    key
                )));
            }
        };

        let socket_timeout = match pool.socket_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        conn.set_timeouts(socket_timeout)
            .map_err(|source| ConnectionError::ConnectFailed {
                endpoint: key.to_string(),
                source,
            })?;

        if let Some(ref password) = options.password {
            conn.authenticate(password, options.username.as_deref())
                .map_err(|e| ConnectionError::AuthFailed(format!("{}: {}", key, e)))?;
        }

        let db = key.db();
        if db != 0 {
            conn.select_db(db)
                .map_err(|e| ConnectionError::SelectFailed {
                    endpoint: key.to_string(),
                    db,
                    message: e.to_string(),
                })?;
        }

        debug!("Opened connection to {}", key);
        Ok(Box::new(conn))
    }
}
