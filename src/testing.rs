//! In-memory server double shared by unit tests
//!
//! Every connection opened through `MockServer::connector()` records the
//! commands it receives against its endpoint, so tests can assert where a
//! command actually ran.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sha1::{Digest, Sha1};

use crate::client::{BoxedConnection, Connector, ControlPlane};
use crate::cluster::{Router, RouterOptions};
use crate::config::NodeId;
use crate::pool::{EndpointKey, EndpointOptions};
use crate::utils::{ConnectionError, RespValue};

pub(crate) const DEFAULT_VERSION: &str = "7.2.4";

#[derive(Default)]
struct ServerState {
    connects: AtomicUsize,
    fail_next: AtomicBool,
    unreachable: Mutex<HashSet<String>>,
    versions: Mutex<HashMap<String, String>>,
    scripts: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
    log: Mutex<Vec<(String, Vec<String>)>>,
}

#[derive(Clone, Default)]
pub(crate) struct MockServer {
    state: Arc<ServerState>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(MockConnector {
            server: self.clone(),
        })
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// The next command on any connection fails with a transport error
    pub fn fail_next_command(&self) {
        self.state.fail_next.store(true, Ordering::SeqCst);
    }

    /// Refuse connections to `host:port` (or socket path)
    pub fn set_unreachable(&self, address: &str) {
        self.state.unreachable.lock().insert(address.to_string());
    }

    /// Version reported by INFO for `host:port`
    pub fn set_version(&self, address: &str, version: &str) {
        self.state
            .versions
            .lock()
            .insert(address.to_string(), version.to_string());
    }

    /// Every command received, as (endpoint, args)
    pub fn commands(&self) -> Vec<(String, Vec<String>)> {
        self.state.log.lock().clone()
    }

    /// Endpoints that received `command`, in arrival order
    pub fn endpoints_for(&self, command: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|(_, args)| {
                args.first()
                    .map_or(false, |c| c.eq_ignore_ascii_case(command))
            })
            .map(|(endpoint, _)| endpoint)
            .collect()
    }
}

struct MockConnector {
    server: MockServer,
}

impl Connector for MockConnector {
    fn connect(
        &self,
        key: &EndpointKey,
        _options: &EndpointOptions,
    ) -> Result<BoxedConnection, ConnectionError> {
        if self.server.state.unreachable.lock().contains(&key.address()) {
            return Err(ConnectionError::ConnectFailed {
                endpoint: key.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }
        self.server.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            endpoint: key.to_string(),
            address: key.address(),
            server: self.server.clone(),
        }))
    }
}

struct MockConnection {
    endpoint: String,
    address: String,
    server: MockServer,
}

impl MockConnection {
    fn reply(&self, args: &[&[u8]]) -> RespValue {
        let state = &self.server.state;
        let command = args
            .first()
            .map(|c| String::from_utf8_lossy(c).to_ascii_uppercase())
            .unwrap_or_default();

        match command.as_str() {
            "PING" => RespValue::SimpleString("PONG".to_string()),
            "AUTH" | "SELECT" => RespValue::SimpleString("OK".to_string()),
            "INFO" => {
                let versions = state.versions.lock();
                let version = versions
                    .get(&self.address)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_VERSION);
                RespValue::BulkString(
                    format!("# Server\r\nredis_version:{}\r\nredis_mode:standalone\r\n", version)
                        .into_bytes(),
                )
            }
            "SCRIPT" if args.len() == 3 => {
                let sha = hex::encode(Sha1::digest(args[2]));
                state
                    .scripts
                    .lock()
                    .entry(self.endpoint.clone())
                    .or_default()
                    .insert(sha.clone(), args[2].to_vec());
                RespValue::BulkString(sha.into_bytes())
            }
            "EVALSHA" if args.len() >= 3 => {
                let sha = String::from_utf8_lossy(args[1]).to_string();
                let body = state
                    .scripts
                    .lock()
                    .get(&self.endpoint)
                    .and_then(|shas| shas.get(&sha).cloned());
                let Some(body) = body else {
                    return RespValue::Error(
                        "NOSCRIPT No matching script. Please use EVAL.".to_string(),
                    );
                };
                if body.windows(11).any(|w| w == b"error_reply") {
                    return RespValue::Error("ERR script rejected the call".to_string());
                }
                let numkeys: usize = String::from_utf8_lossy(args[2]).parse().unwrap_or(0);
                let keys = args[3..(3 + numkeys).min(args.len())]
                    .iter()
                    .map(|k| RespValue::BulkString(k.to_vec()));
                let mut reply = vec![RespValue::BulkString(self.endpoint.clone().into_bytes())];
                reply.extend(keys);
                RespValue::Array(reply)
            }
            _ => RespValue::Error(format!("ERR unknown command '{}'", command)),
        }
    }
}

impl ControlPlane for MockConnection {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        let bytes: Vec<&[u8]> = args.iter().map(|a| a.as_bytes()).collect();
        self.execute_binary(&bytes)
    }

    fn execute_binary(&mut self, args: &[&[u8]]) -> io::Result<RespValue> {
        if self.server.state.fail_next.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"));
        }
        self.server.state.log.lock().push((
            self.endpoint.clone(),
            args.iter()
                .map(|a| String::from_utf8_lossy(a).to_string())
                .collect(),
        ));
        Ok(self.reply(args))
    }
}

/// Routes by a key's first character through `router_options.prefixes`
pub(crate) struct PrefixRouter;

impl Router for PrefixRouter {
    fn node_for_key(&self, key: &[u8], nodes: &[NodeId], options: &RouterOptions) -> Option<NodeId> {
        let prefixes = options.get("prefixes")?.as_object()?;
        let first = std::str::from_utf8(key.get(..1)?).ok()?;
        let id = prefixes.get(first)?.as_str()?;
        nodes.iter().find(|node| node.as_str() == id).cloned()
    }
}
