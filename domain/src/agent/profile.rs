//! Delegated agent profiles.

use crate::core::error::DomainError;
use crate::core::model::Model;
use serde::{Deserialize, Serialize};

/// A named persona a run can delegate work to.
///
/// Fields left as `None` inherit from the delegating run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<Model>,
    /// Allowlist of tool names; `None` means every tool the parent exposes
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: None,
            model: None,
            allowed_tools: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Whether this profile lets a child run see the given tool
    pub fn allows(&self, tool_name: &str) -> bool {
        match &self.allowed_tools {
            Some(list) => list.iter().any(|t| t == tool_name),
            None => true,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidProfile {
                name: self.name.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        if self.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(DomainError::InvalidProfile {
                name: self.name.clone(),
                reason: "system_prompt must not be blank".to_string(),
            });
        }
        Ok(())
    }
}
