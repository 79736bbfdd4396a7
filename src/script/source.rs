//! Where script bodies come from

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Loads raw script source by path relative to a resource bundle
pub trait ScriptSource: Send + Sync {
    fn load_bytes(&self, relative_path: &str) -> io::Result<Vec<u8>>;
}

/// Scripts shipped as files under `<root>/scripts/`
#[derive(Debug, Clone)]
pub struct DirectoryScriptSource {
    root: PathBuf,
}

impl DirectoryScriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative_path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative_path);
        // Keep lookups inside the bundle
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("script path {:?} escapes the scripts directory", relative_path),
            ));
        }
        Ok(self.root.join("scripts").join(relative))
    }
}

impl ScriptSource for DirectoryScriptSource {
    fn load_bytes(&self, relative_path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(relative_path)?)
    }
}

/// Scripts compiled into the binary, e.g. with `include_bytes!`
#[derive(Debug, Clone, Default)]
pub struct StaticScriptSource {
    scripts: HashMap<String, &'static [u8]>,
}

impl StaticScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, relative_path: &str, body: &'static [u8]) -> Self {
        self.scripts.insert(relative_path.to_string(), body);
        self
    }
}

impl ScriptSource for StaticScriptSource {
    fn load_bytes(&self, relative_path: &str) -> io::Result<Vec<u8>> {
        self.scripts
            .get(relative_path)
            .map(|body| body.to_vec())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no bundled script {:?}", relative_path),
                )
            })
    }
}
