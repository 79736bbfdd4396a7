//! Client connection layer

pub mod connector;
pub mod control_plane;
pub mod raw_connection;

pub use connector::{BoxedConnection, Connector, RawConnector};
pub use control_plane::{ControlPlane, ControlPlaneExt};
pub use raw_connection::RawConnection;
