//! Configuration file loading for kestrel
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `KESTREL_` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./kestrel.toml` or `./.kestrel.toml`
//! 4. Global: `$XDG_CONFIG_HOME/kestrel/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileAgentConfig, FileAgentProfile, FileCompactionConfig, FileConfig,
    FileHookCommand, FileHooksConfig, FilePermissionsConfig, FileRiskDefaults, FileToolsConfig,
    Severity,
};
pub use loader::{ConfigError, ConfigLoader, ConfigSource};
