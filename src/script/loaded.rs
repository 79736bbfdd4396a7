//! Server-side scripts invoked against an explicit target

use std::fmt;
use std::io;
use std::sync::Arc;

use sha1::{Digest, Sha1};
use tracing::debug;

use super::source::ScriptSource;
use crate::client::{ControlPlane, ControlPlaneExt};
use crate::cluster::ClusterClient;
use crate::utils::{RegistryError, RespValue, Result};

/// A script body and its SHA1, bound to no connection
///
/// Cloning is cheap and clones share the body. Every `invoke` names the
/// connection it runs on; nothing about previous invocations is kept.
#[derive(Clone)]
pub struct LoadedScript {
    name: String,
    body: Arc<[u8]>,
    sha: String,
}

impl LoadedScript {
    pub fn new(name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        let sha = hex::encode(Sha1::digest(&body));
        Self {
            name: name.into(),
            body: body.into(),
            sha,
        }
    }

    /// Read `relative_path` from `source`
    pub fn load(source: &dyn ScriptSource, relative_path: &str) -> Result<Self> {
        let body = source
            .load_bytes(relative_path)
            .map_err(|e| RegistryError::Script {
                path: relative_path.to_string(),
                source: e,
            })?;
        Ok(Self::new(relative_path, body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercase hex SHA1 of the body, as the server names it
    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// Run the script on `target`
    ///
    /// Sends EVALSHA; if `target` does not know the script yet it is loaded
    /// there and the EVALSHA is sent once more. Whatever the server answers
    /// after that, error replies included, is returned as-is.
    pub fn invoke<C, K, A>(&self, target: &mut C, keys: &[K], args: &[A]) -> io::Result<RespValue>
    where
        C: ControlPlane + ?Sized,
        K: AsRef<[u8]>,
        A: AsRef<[u8]>,
    {
        let keys: Vec<&[u8]> = keys.iter().map(AsRef::as_ref).collect();
        let args: Vec<&[u8]> = args.iter().map(AsRef::as_ref).collect();

        let reply = target.evalsha(&self.sha, &keys, &args)?;
        if !reply.is_noscript() {
            return Ok(reply);
        }

        debug!("Script {} ({}) not cached on target, loading", self.name, self.sha);
        target.script_load(&self.body)?;
        target.evalsha(&self.sha, &keys, &args)
    }

    /// Run the script on the node of `cluster` that owns `keys`
    ///
    /// The cluster's router picks the node; keys it cannot place on a
    /// single node are `Unroutable` and nothing is sent.
    pub fn invoke_on_cluster<K, A>(
        &self,
        cluster: &ClusterClient,
        keys: &[K],
        args: &[A],
    ) -> Result<RespValue>
    where
        K: AsRef<[u8]>,
        A: AsRef<[u8]>,
    {
        let mut conn = cluster.connection_for_keys(keys)?;
        Ok(self.invoke(&mut conn, keys, args)?)
    }
}

impl fmt::Debug for LoadedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedScript")
            .field("name", &self.name)
            .field("sha", &self.sha)
            .field("len", &self.body.len())
            .finish()
    }
}
