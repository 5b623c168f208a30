//! Rule-based permission gateway.
//!
//! Tool names are matched against the `deny`, `ask` and `allow` glob lists
//! in that order; the first list with a match decides. Unmatched tools fall
//! back to the per-risk default. A tool without a risk level is treated as
//! dangerous.

use crate::config::{FilePermissionsConfig, FileRiskDefaults};
use kestrel_application::{PermissionDecision, PermissionGateway};
use kestrel_domain::{RiskLevel, ToolDefinition};
use tracing::{debug, warn};

pub struct RulePermissionGateway {
    deny: Vec<glob::Pattern>,
    ask: Vec<glob::Pattern>,
    allow: Vec<glob::Pattern>,
    defaults: FileRiskDefaults,
}

fn compile(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|pattern| match glob::Pattern::new(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Ignoring invalid permission pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}

impl RulePermissionGateway {
    pub fn from_config(config: &FilePermissionsConfig) -> Self {
        Self {
            deny: compile(&config.deny),
            ask: compile(&config.ask),
            allow: compile(&config.allow),
            defaults: config.default_by_risk.clone(),
        }
    }

    fn matches(patterns: &[glob::Pattern], name: &str) -> bool {
        patterns.iter().any(|p| p.matches(name))
    }
}

impl PermissionGateway for RulePermissionGateway {
    fn check(&self, tool: &ToolDefinition) -> PermissionDecision {
        let decision = if Self::matches(&self.deny, &tool.name) {
            PermissionDecision::Deny
        } else if Self::matches(&self.ask, &tool.name) {
            PermissionDecision::Ask
        } else if Self::matches(&self.allow, &tool.name) {
            PermissionDecision::Allow
        } else {
            self.defaults
                .decision_for(tool.risk_level.unwrap_or(RiskLevel::Dangerous))
        };
        debug!(tool = %tool.name, decision = %decision, "Permission check");
        decision
    }
}
