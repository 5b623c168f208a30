//! Permission Gateway port
//!
//! Decides, per tool call, whether execution proceeds. `Deny` is never an
//! exception: the runtime turns it into an error result for that call.

use kestrel_domain::ToolDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    /// Needs out-of-band confirmation (reported as a request/response event pair)
    Ask,
    Deny,
}

impl PermissionDecision {
    pub fn as_str(&self) -> &str {
        match self {
            PermissionDecision::Allow => "allow",
            PermissionDecision::Ask => "ask",
            PermissionDecision::Deny => "deny",
        }
    }
}

impl std::fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Port for permission checks before a tool executes.
pub trait PermissionGateway: Send + Sync {
    fn check(&self, tool: &ToolDefinition) -> PermissionDecision;

    /// Resolve an `Ask` decision. Headless runs approve.
    fn confirm(&self, _tool: &ToolDefinition) -> bool {
        true
    }
}

/// Allows everything. Used by tests and headless child runs without rules.
pub struct AllowAllPermissions;

impl PermissionGateway for AllowAllPermissions {
    fn check(&self, _tool: &ToolDefinition) -> PermissionDecision {
        PermissionDecision::Allow
    }
}
