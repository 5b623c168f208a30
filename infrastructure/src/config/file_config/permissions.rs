//! Permission rules from TOML (`[permissions]` section)
//!
//! ```toml
//! [permissions]
//! allow = ["read_*", "todo_write"]
//! ask = ["shell"]
//! deny = ["rm_*"]
//!
//! [permissions.default_by_risk]
//! safe = "allow"
//! moderate = "allow"
//! dangerous = "ask"
//! ```
//!
//! A tool matching several lists takes the strictest: deny, then ask, then
//! allow. Tools matching none fall back to their risk level.

use super::{ConfigIssue, Severity};
use kestrel_application::PermissionDecision;
use kestrel_domain::RiskLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePermissionsConfig {
    pub allow: Vec<String>,
    pub ask: Vec<String>,
    pub deny: Vec<String>,
    pub default_by_risk: FileRiskDefaults,
}

/// Decision for tools no rule matches, per risk level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRiskDefaults {
    pub safe: PermissionDecision,
    pub moderate: PermissionDecision,
    pub dangerous: PermissionDecision,
}

impl Default for FileRiskDefaults {
    fn default() -> Self {
        Self {
            safe: PermissionDecision::Allow,
            moderate: PermissionDecision::Allow,
            dangerous: PermissionDecision::Ask,
        }
    }
}

impl FileRiskDefaults {
    pub fn decision_for(&self, risk: RiskLevel) -> PermissionDecision {
        match risk {
            RiskLevel::Safe => self.safe,
            RiskLevel::Moderate => self.moderate,
            RiskLevel::Dangerous => self.dangerous,
        }
    }
}

impl FilePermissionsConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let lists = [("allow", &self.allow), ("ask", &self.ask), ("deny", &self.deny)];
        lists
            .into_iter()
            .flat_map(|(list, patterns)| {
                patterns.iter().filter_map(move |pattern| {
                    glob::Pattern::new(pattern).err().map(|e| {
                        ConfigIssue::new(
                            Severity::Warning,
                            format!("permissions.{}", list),
                            format!(
                                "permissions.{}: invalid pattern '{}' ({}), rule ignored",
                                list, pattern, e
                            ),
                        )
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_rules_and_defaults() {
        let toml_str = r#"
[permissions]
allow = ["read_*"]
deny = ["rm"]

[permissions.default_by_risk]
dangerous = "deny"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let permissions = &config.permissions;
        assert_eq!(permissions.allow, vec!["read_*"]);
        assert!(permissions.ask.is_empty());
        assert_eq!(
            permissions.default_by_risk.decision_for(RiskLevel::Dangerous),
            PermissionDecision::Deny
        );
        assert_eq!(
            permissions.default_by_risk.decision_for(RiskLevel::Moderate),
            PermissionDecision::Allow
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = FilePermissionsConfig {
            ask: vec!["[unclosed".into()],
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "permissions.ask");
    }
}
