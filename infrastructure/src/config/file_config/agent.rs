//! Agent configuration from TOML (`[agent]` and `[[agents]]` sections)

use super::{ConfigIssue, Severity};
use kestrel_application::RuntimeConfig;
use kestrel_domain::{AgentProfile, Model};
use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// model = "claude-sonnet-4.5"
/// max_iterations = 10
/// system_prompt = "You are a careful release engineer."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Model used for the top-level run
    pub model: String,
    /// Maximum model round-trips per run
    pub max_iterations: u32,
    /// System prompt override (built-in prompt when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            model: defaults.model.to_string(),
            max_iterations: defaults.max_iterations,
            system_prompt: None,
        }
    }
}

impl FileAgentConfig {
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::default()
            .with_model(Model::from(self.model.trim()))
            .with_max_iterations(self.max_iterations);
        if let Some(prompt) = &self.system_prompt {
            config = config.with_system_prompt(prompt.clone());
        }
        config
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.model.trim().is_empty() {
            issues.push(ConfigIssue::new(
                Severity::Error,
                "agent.model",
                "agent.model: model name cannot be empty",
            ));
        }
        if self.max_iterations == 0 {
            issues.push(ConfigIssue::new(
                Severity::Error,
                "agent.max_iterations",
                "agent.max_iterations: must be at least 1",
            ));
        }
        issues
    }
}

/// A delegated agent profile (`[[agents]]` entry)
///
/// ```toml
/// [[agents]]
/// name = "explorer"
/// description = "Read-only code exploration"
/// system_prompt = "Explore the repository and report findings."
/// model = "claude-haiku-4.5"
/// tools = ["read_file", "search"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentProfile {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Tool allowlist; all parent tools when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl FileAgentProfile {
    pub fn to_profile(&self) -> AgentProfile {
        let mut profile = AgentProfile::new(&self.name, &self.description);
        if let Some(prompt) = &self.system_prompt {
            profile = profile.with_system_prompt(prompt.clone());
        }
        if let Some(model) = &self.model
            && !model.trim().is_empty()
        {
            profile = profile.with_model(Model::from(model.trim()));
        }
        if let Some(tools) = &self.tools {
            profile = profile.with_allowed_tools(tools.iter().cloned());
        }
        profile
    }
}
