//! Tools configuration from TOML (`[tools]` section)
//!
//! ```toml
//! [tools]
//! plugin_dirs = ["./tools", "~/kestrel-tools"]
//! todo = true
//! ```
//!
//! Plugin directories are scanned for `*.tool.toml` manifests in addition
//! to the well-known locations (`./.kestrel/tools` and the global config
//! directory's `tools/`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    /// Extra plugin directories, scanned after the well-known ones
    pub plugin_dirs: Vec<PathBuf>,
    /// Register the built-in `todo_write` tool
    pub todo: bool,
}

impl Default for FileToolsConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            todo: true,
        }
    }
}

impl FileToolsConfig {
    /// Well-known plugin locations followed by the configured ones, with `~`
    /// expanded and duplicates removed.
    pub fn resolved_plugin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from(".kestrel").join("tools")];
        if let Some(config_dir) = dirs::config_dir() {
            dirs.push(config_dir.join("kestrel").join("tools"));
        }
        dirs.extend(self.plugin_dirs.iter().map(|d| expand_home(d)));

        let mut seen = std::collections::HashSet::new();
        dirs.retain(|d| seen.insert(d.clone()));
        dirs
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
