//! Control plane trait for server communication
//!
//! Everything above the socket talks to a server through `ControlPlane`:
//! raw connections, pooled checkouts, and test doubles all implement it,
//! so pool, script and version code never care which one they hold.

use crate::utils::RespValue;
use std::io;

/// A connection that can run one command and return its reply
///
/// Server-side errors are returned as `Ok(RespValue::Error(..))`; only
/// transport failures surface as `Err`.
pub trait ControlPlane {
    /// Execute a command with string arguments
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue>;

    /// Execute a command with binary arguments
    fn execute_binary(&mut self, args: &[&[u8]]) -> io::Result<RespValue>;
}

/// Convenience commands built on `ControlPlane`
pub trait ControlPlaneExt: ControlPlane {
    /// Send PING and verify PONG response
    fn ping(&mut self) -> io::Result<bool> {
        match self.execute(&["PING"])? {
            RespValue::SimpleString(s) => Ok(s == "PONG"),
            _ => Ok(false),
        }
    }

    /// Get INFO for a section (empty string returns the default sections)
    fn info(&mut self, section: &str) -> io::Result<String> {
        let response = if section.is_empty() {
            self.execute(&["INFO"])?
        } else {
            self.execute(&["INFO", section])?
        };

        match response {
            RespValue::BulkString(data) => String::from_utf8(data).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
            }),
            RespValue::Error(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
            other => Err(unexpected("INFO", &other)),
        }
    }

    fn authenticate(&mut self, password: &str, username: Option<&str>) -> io::Result<()> {
        let response = match username {
            Some(user) => self.execute(&["AUTH", user, password])?,
            None => self.execute(&["AUTH", password])?,
        };

        match response {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            RespValue::Error(e) => Err(io::Error::new(io::ErrorKind::PermissionDenied, e)),
            other => Err(unexpected("AUTH", &other)),
        }
    }

    fn select_db(&mut self, db: u32) -> io::Result<()> {
        let db_str = db.to_string();
        match self.execute(&["SELECT", &db_str])? {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            RespValue::Error(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
            other => Err(unexpected("SELECT", &other)),
        }
    }

    /// SCRIPT LOAD, returning the SHA1 the server registered the body under
    fn script_load(&mut self, body: &[u8]) -> io::Result<String> {
        match self.execute_binary(&[b"SCRIPT", b"LOAD", body])? {
            reply @ (RespValue::BulkString(_) | RespValue::SimpleString(_)) => reply
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8 SHA")),
            RespValue::Error(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
            other => Err(unexpected("SCRIPT LOAD", &other)),
        }
    }

    /// EVALSHA with keys and arguments; the reply is returned as-is
    fn evalsha(&mut self, sha: &str, keys: &[&[u8]], args: &[&[u8]]) -> io::Result<RespValue> {
        let numkeys = keys.len().to_string();
        let mut command: Vec<&[u8]> = Vec::with_capacity(3 + keys.len() + args.len());
        command.push(b"EVALSHA");
        command.push(sha.as_bytes());
        command.push(numkeys.as_bytes());
        command.extend_from_slice(keys);
        command.extend_from_slice(args);
        self.execute_binary(&command)
    }
}

impl<T: ControlPlane + ?Sized> ControlPlaneExt for T {}

fn unexpected(command: &str, reply: &RespValue) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Unexpected {} response: {:?}", command, reply),
    )
}
