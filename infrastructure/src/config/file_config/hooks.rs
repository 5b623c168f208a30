//! Hook commands from TOML (`[hooks]` section)
//!
//! ```toml
//! [[hooks.pre_tool_use]]
//! matcher = "shell*"
//! command = "./scripts/check-shell.sh"
//!
//! [[hooks.post_tool_use]]
//! command = "logger -t kestrel"
//! timeout_secs = 5
//! ```

use super::{ConfigIssue, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHooksConfig {
    pub pre_tool_use: Vec<FileHookCommand>,
    pub post_tool_use: Vec<FileHookCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHookCommand {
    /// Glob over tool names; every tool when omitted
    #[serde(default = "default_matcher")]
    pub matcher: String,
    /// Shell command; receives the JSON payload on stdin
    pub command: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_matcher() -> String {
    "*".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl FileHooksConfig {
    pub fn is_empty(&self) -> bool {
        self.pre_tool_use.is_empty() && self.post_tool_use.is_empty()
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (section, hooks) in [
            ("hooks.pre_tool_use", &self.pre_tool_use),
            ("hooks.post_tool_use", &self.post_tool_use),
        ] {
            for hook in hooks {
                if hook.command.trim().is_empty() {
                    issues.push(ConfigIssue::new(
                        Severity::Error,
                        section,
                        format!("{}: hook command cannot be empty", section),
                    ));
                }
                if glob::Pattern::new(&hook.matcher).is_err() {
                    issues.push(ConfigIssue::new(
                        Severity::Warning,
                        section,
                        format!("{}: invalid matcher '{}'", section, hook.matcher),
                    ));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let toml_str = r#"
[[hooks.pre_tool_use]]
command = "check"

[[hooks.post_tool_use]]
matcher = "shell"
command = "audit"
timeout_secs = 2
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hooks.pre_tool_use[0].matcher, "*");
        assert_eq!(config.hooks.pre_tool_use[0].timeout_secs, 30);
        assert_eq!(config.hooks.post_tool_use[0].timeout_secs, 2);
        assert!(config.hooks.validate().is_empty());
    }

    #[test]
    fn test_empty_command_is_error() {
        let config = FileHooksConfig {
            pre_tool_use: vec![FileHookCommand {
                matcher: "*".into(),
                command: " ".into(),
                timeout_secs: 1,
            }],
            ..Default::default()
        };
        assert_eq!(config.validate()[0].severity, Severity::Error);
    }
}
