//! Hook Gateway port
//!
//! User-configured hooks run before and after each tool execution. A
//! pre-execution hook may veto the call; its message becomes the error text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
}

impl HookEvent {
    pub fn as_str(&self) -> &str {
        match self {
            HookEvent::PreToolUse => "pre_tool_use",
            HookEvent::PostToolUse => "post_tool_use",
        }
    }
}

/// Verdict of running the hooks for one lifecycle point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub allow: bool,
    pub message: Option<String>,
}

impl HookOutcome {
    pub fn allow() -> Self {
        Self {
            allow: true,
            message: None,
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        Self {
            allow: false,
            message: Some(message.into()),
        }
    }
}

/// Port for running lifecycle hooks.
#[async_trait]
pub trait HookGateway: Send + Sync {
    async fn run(&self, event: HookEvent, payload: &serde_json::Value) -> HookOutcome;
}

/// No hooks configured: everything is allowed.
pub struct NoHooks;

#[async_trait]
impl HookGateway for NoHooks {
    async fn run(&self, _event: HookEvent, _payload: &serde_json::Value) -> HookOutcome {
        HookOutcome::allow()
    }
}
