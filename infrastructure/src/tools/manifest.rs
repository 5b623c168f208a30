//! Plugin tool manifests (`*.tool.toml`).
//!
//! Each manifest describes one command-backed tool:
//!
//! ```toml
//! name = "git_log"
//! description = "Show recent commits"
//! domain = "git"
//! risk = "safe"
//! command = "git log --oneline -n {count}"
//! timeout_secs = 30
//!
//! [[parameters]]
//! name = "count"
//! type = "integer"
//! description = "Number of commits"
//! required = true
//! ```
//!
//! `{param}` placeholders in `command` are replaced with shell-escaped
//! argument values at call time. `risk` defaults to `dangerous`.

use kestrel_domain::{RiskLevel, ToolDefinition, ToolParameter};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub name: String,
    pub description: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_risk")]
    pub risk: RiskLevel,
    pub command: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub parameters: Vec<ManifestParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
}

fn default_domain() -> String {
    "plugin".to_string()
}

fn default_risk() -> RiskLevel {
    RiskLevel::Dangerous
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_param_type() -> String {
    "string".to_string()
}

impl ToolManifest {
    pub fn parse(text: &str) -> Result<Self, String> {
        let manifest: ToolManifest = toml::from_str(text).map_err(|e| e.to_string())?;
        manifest.check()?;
        Ok(manifest)
    }

    fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!("invalid tool name '{}'", self.name));
        }
        if self.command.trim().is_empty() {
            return Err("command cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn to_definition(&self) -> ToolDefinition {
        self.parameters.iter().fold(
            ToolDefinition::new(self.name.as_str(), self.description.as_str(), self.risk)
                .with_domain(self.domain.as_str()),
            |definition, param| {
                definition.with_parameter(
                    ToolParameter::new(
                        param.name.as_str(),
                        param.description.as_str(),
                        param.required,
                    )
                    .with_type(param.param_type.as_str()),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT_LOG: &str = r#"
name = "git_log"
description = "Show recent commits"
domain = "git"
risk = "safe"
command = "git log --oneline -n {count}"

[[parameters]]
name = "count"
type = "integer"
description = "Number of commits"
required = true
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = ToolManifest::parse(GIT_LOG).unwrap();
        assert_eq!(manifest.timeout_secs, 60);

        let definition = manifest.to_definition();
        assert_eq!(definition.name, "git_log");
        assert_eq!(definition.domain, "git");
        assert_eq!(definition.risk_level, Some(RiskLevel::Safe));
        let count = definition.parameters().first().unwrap();
        assert_eq!(count.param_type, "integer");
        assert!(count.required);
    }

    #[test]
    fn test_defaults_are_conservative() {
        let manifest =
            ToolManifest::parse("name = \"deploy\"\ndescription = \"d\"\ncommand = \"make deploy\"\n")
                .unwrap();
        assert_eq!(manifest.risk, RiskLevel::Dangerous);
        assert_eq!(manifest.domain, "plugin");
        assert!(manifest.parameters.is_empty());
    }

    #[test]
    fn test_rejects_bad_manifests() {
        assert!(ToolManifest::parse("description = \"d\"\ncommand = \"x\"").is_err());
        assert!(ToolManifest::parse("name = \"a b\"\ndescription = \"d\"\ncommand = \"x\"").is_err());
        assert!(ToolManifest::parse("name = \"a\"\ndescription = \"d\"\ncommand = \" \"").is_err());
        assert!(ToolManifest::parse("name = \"a\"\ndescription = \"d\"\ncommand = \"x\"\nrisk = \"extreme\"").is_err());
    }
}
