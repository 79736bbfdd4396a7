//! Utility modules

pub mod error;
pub mod info;
pub mod resp;

pub use error::{ConnectionError, RegistryError, Result};
pub use info::{parse_info, InfoSection};
pub use resp::{RespDecoder, RespEncoder, RespValue};
