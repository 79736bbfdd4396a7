//! Server-side scripts
//!
//! A `LoadedScript` carries no connection affinity; callers pass the target
//! connection to every `invoke`.

pub mod loaded;
pub mod source;

pub use loaded::LoadedScript;
pub use source::{DirectoryScriptSource, ScriptSource, StaticScriptSource};
