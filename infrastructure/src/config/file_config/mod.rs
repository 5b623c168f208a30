//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application and
//! domain types by `to_*` methods.

mod agent;
mod compaction;
mod hooks;
mod permissions;
mod tools;

pub use agent::{FileAgentConfig, FileAgentProfile};
pub use compaction::FileCompactionConfig;
pub use hooks::{FileHookCommand, FileHooksConfig};
pub use permissions::{FilePermissionsConfig, FileRiskDefaults};
pub use tools::FileToolsConfig;

use kestrel_domain::AgentProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How serious a configuration issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// One problem found by [`FileConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    /// Dotted path of the offending setting
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(severity: Severity, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Top-level run settings
    pub agent: FileAgentConfig,
    /// History compaction budget
    pub compaction: FileCompactionConfig,
    /// Permission rules
    pub permissions: FilePermissionsConfig,
    /// Pre/post tool hooks
    pub hooks: FileHooksConfig,
    /// Tool discovery settings
    pub tools: FileToolsConfig,
    /// Delegated agent profiles
    pub agents: Vec<FileAgentProfile>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Agent model and iteration limit
    /// 2. Compaction window
    /// 3. Permission and hook patterns
    /// 4. Agent profiles (empty or duplicate names, empty allowlists)
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.agent.validate());
        issues.extend(self.compaction.to_policy().1);
        issues.extend(self.permissions.validate());
        issues.extend(self.hooks.validate());

        let mut names = HashSet::new();
        for entry in &self.agents {
            if let Err(e) = entry.to_profile().validate() {
                issues.push(ConfigIssue::new(Severity::Error, "agents", e.to_string()));
            }
            if !entry.name.is_empty() && !names.insert(entry.name.as_str()) {
                issues.push(ConfigIssue::new(
                    Severity::Error,
                    "agents",
                    format!("agents: duplicate profile name '{}'", entry.name),
                ));
            }
        }

        issues
    }

    pub fn agent_profiles(&self) -> Vec<AgentProfile> {
        self.agents.iter().map(FileAgentProfile::to_profile).collect()
    }
}
