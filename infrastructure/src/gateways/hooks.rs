//! Command hook gateway.
//!
//! Each configured hook whose `matcher` glob matches the tool name runs as a
//! shell command with the JSON payload on stdin. Hooks run in order. For
//! `pre_tool_use`, exit status 2 vetoes the call and stderr becomes the
//! message; any other status allows it. Hooks that fail to start or time out
//! are logged and treated as allowing.

use crate::config::{FileHookCommand, FileHooksConfig};
use async_trait::async_trait;
use kestrel_application::{HookEvent, HookGateway, HookOutcome};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit status that blocks a tool call.
pub const BLOCK_EXIT_CODE: i32 = 2;

struct Hook {
    matcher: glob::Pattern,
    command: String,
    timeout: Duration,
}

impl Hook {
    fn compile(config: &FileHookCommand) -> Option<Self> {
        let matcher = match glob::Pattern::new(&config.matcher) {
            Ok(p) => p,
            Err(e) => {
                warn!("Ignoring hook with invalid matcher '{}': {}", config.matcher, e);
                return None;
            }
        };
        Some(Self {
            matcher,
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

enum HookResult {
    Passed,
    Blocked(String),
}

pub struct CommandHookGateway {
    pre_tool_use: Vec<Hook>,
    post_tool_use: Vec<Hook>,
}

impl CommandHookGateway {
    pub fn from_config(config: &FileHooksConfig) -> Self {
        let compile = |hooks: &[FileHookCommand]| -> Vec<Hook> {
            hooks.iter().filter_map(Hook::compile).collect()
        };
        Self {
            pre_tool_use: compile(&config.pre_tool_use),
            post_tool_use: compile(&config.post_tool_use),
        }
    }

    async fn execute(hook: &Hook, input: &[u8]) -> Result<HookResult, String> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", &hook.command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", &hook.command]);
            c
        };
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| e.to_string())?;
        if let Some(mut stdin) = child.stdin.take() {
            // A hook that exits without reading its input is fine.
            if let Err(e) = stdin.write_all(input).await {
                debug!("Hook did not read its input: {}", e);
            }
        }

        let output = tokio::time::timeout(hook.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {}s", hook.timeout.as_secs()))?
            .map_err(|e| e.to_string())?;

        if output.status.code() == Some(BLOCK_EXIT_CODE) {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Ok(HookResult::Blocked(stderr));
        }
        Ok(HookResult::Passed)
    }
}

#[async_trait]
impl HookGateway for CommandHookGateway {
    async fn run(&self, event: HookEvent, payload: &serde_json::Value) -> HookOutcome {
        let hooks = match event {
            HookEvent::PreToolUse => &self.pre_tool_use,
            HookEvent::PostToolUse => &self.post_tool_use,
        };
        let tool = payload["tool"].as_str().unwrap_or_default();
        let input = payload.to_string().into_bytes();

        for hook in hooks.iter().filter(|h| h.matcher.matches(tool)) {
            debug!(tool = %tool, event = event.as_str(), command = %hook.command, "Running hook");
            match Self::execute(hook, &input).await {
                Ok(HookResult::Passed) => {}
                Ok(HookResult::Blocked(message)) => {
                    if event == HookEvent::PreToolUse {
                        let message = if message.is_empty() {
                            format!("Blocked by hook: {}", hook.command)
                        } else {
                            message
                        };
                        return HookOutcome::block(message);
                    }
                    if !message.is_empty() {
                        return HookOutcome {
                            allow: true,
                            message: Some(message),
                        };
                    }
                }
                Err(e) => warn!(tool = %tool, command = %hook.command, "Hook failed: {}", e),
            }
        }
        HookOutcome::allow()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway(pre: &[(&str, &str)]) -> CommandHookGateway {
        CommandHookGateway::from_config(&FileHooksConfig {
            pre_tool_use: pre
                .iter()
                .map(|(matcher, command)| FileHookCommand {
                    matcher: matcher.to_string(),
                    command: command.to_string(),
                    timeout_secs: 5,
                })
                .collect(),
            post_tool_use: Vec::new(),
        })
    }

    fn payload(tool: &str) -> serde_json::Value {
        json!({"event": "pre_tool_use", "tool": tool, "arguments": {}})
    }

    #[tokio::test]
    async fn test_exit_two_blocks_with_stderr() {
        let gateway = gateway(&[("deploy*", "echo 'not on fridays' >&2; exit 2")]);
        let outcome = gateway.run(HookEvent::PreToolUse, &payload("deploy")).await;
        assert!(!outcome.allow);
        assert_eq!(outcome.message.as_deref(), Some("not on fridays"));
    }

    #[tokio::test]
    async fn test_matcher_filters_tools() {
        let gateway = gateway(&[("deploy*", "exit 2")]);
        let outcome = gateway.run(HookEvent::PreToolUse, &payload("git_log")).await;
        assert!(outcome.allow);
    }

    #[tokio::test]
    async fn test_other_exit_codes_allow() {
        let gateway = gateway(&[("*", "exit 1")]);
        let outcome = gateway.run(HookEvent::PreToolUse, &payload("task")).await;
        assert_eq!(outcome, HookOutcome::allow());
    }

    #[tokio::test]
    async fn test_hook_reads_payload() {
        let gateway = gateway(&[(
            "*",
            "grep -q '\"tool\":\"secret\"' && { echo found >&2; exit 2; }; exit 0",
        )]);
        let blocked = gateway.run(HookEvent::PreToolUse, &payload("secret")).await;
        assert_eq!(blocked.message.as_deref(), Some("found"));
        let allowed = gateway.run(HookEvent::PreToolUse, &payload("public")).await;
        assert!(allowed.allow);
    }

    #[tokio::test]
    async fn test_post_hooks_never_block() {
        let gateway = CommandHookGateway::from_config(&FileHooksConfig {
            pre_tool_use: Vec::new(),
            post_tool_use: vec![FileHookCommand {
                matcher: "*".into(),
                command: "echo noted >&2; exit 2".into(),
                timeout_secs: 5,
            }],
        });
        let outcome = gateway.run(HookEvent::PostToolUse, &payload("task")).await;
        assert!(outcome.allow);
        assert_eq!(outcome.message.as_deref(), Some("noted"));
    }
}
