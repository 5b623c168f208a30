//! Model-facing delegation capabilities: `task`, `task_status`, `task_cancel`.

use super::{DelegationOutcome, DelegationRequest, TaskDelegator};
use crate::ports::tool_handler::{ToolContext, ToolHandler};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use kestrel_domain::{RiskLevel, TaskId, ToolCall, ToolDefinition, ToolError, ToolParameter};
use serde_json::json;
use std::sync::Arc;

pub const TASK_TOOL: &str = "task";
pub const TASK_STATUS_TOOL: &str = "task_status";
pub const TASK_CANCEL_TOOL: &str = "task_cancel";

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::execution_failed(e.to_string()))
}

/// Delegates a prompt to a nested agent run.
pub struct TaskTool {
    delegator: Arc<TaskDelegator>,
}

impl TaskTool {
    pub fn new(delegator: Arc<TaskDelegator>) -> Self {
        Self { delegator }
    }

    pub fn definition(&self) -> ToolDefinition {
        let mut description = String::from(
            "Launch a sub-agent for a self-contained task. The sub-agent starts with a fresh \
             conversation and returns its final answer. Set run_in_background to get a task id \
             immediately and check on it later with task_status.",
        );
        let profiles = self.delegator.profile_names();
        if !profiles.is_empty() {
            description.push_str(&format!(" Available agents: {}.", profiles.join(", ")));
        }

        ToolDefinition::new(TASK_TOOL, description, RiskLevel::Moderate)
            .with_domain("agent")
            .with_parameter(ToolParameter::new(
                "description",
                "Short (3-5 word) description of the task",
                true,
            ))
            .with_parameter(ToolParameter::new(
                "prompt",
                "Complete instructions for the sub-agent",
                true,
            ))
            .with_parameter(ToolParameter::new(
                "subagent_type",
                "Name of the agent profile to use",
                false,
            ))
            .with_parameter(
                ToolParameter::new(
                    "run_in_background",
                    "Return a task id immediately instead of waiting",
                    false,
                )
                .with_type("boolean"),
            )
    }

    pub fn into_spec(self) -> ToolSpec {
        ToolSpec::new(self.definition(), Arc::new(self))
    }
}

#[async_trait]
impl ToolHandler for TaskTool {
    async fn call(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let description = call
            .require_string("description")
            .map_err(ToolError::invalid_argument)?;
        let prompt = call
            .require_string("prompt")
            .map_err(ToolError::invalid_argument)?;

        let mut request = DelegationRequest::new(description, prompt);
        if let Some(agent) = call.get_string("subagent_type")
            && !agent.is_empty()
        {
            request = request.with_agent(agent);
        }
        if call.get_bool("run_in_background").unwrap_or(false) {
            request = request.in_background();
        }

        match self.delegator.delegate(request, ctx).await {
            Ok(DelegationOutcome::Completed(result)) => to_json(&json!({
                "answer": result.answer,
                "iterations": result.iterations,
                "duration_ms": result.duration_ms,
                "tool_calls": result.ledger.len(),
            })),
            Ok(DelegationOutcome::Spawned(id)) => to_json(&json!({
                "task_id": id,
                "status": "running",
            })),
            Err(e) => Err(e.to_tool_error()),
        }
    }
}

/// Looks up background tasks by id, or lists them all.
pub struct TaskStatusTool {
    delegator: Arc<TaskDelegator>,
}

impl TaskStatusTool {
    pub fn new(delegator: Arc<TaskDelegator>) -> Self {
        Self { delegator }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            TASK_STATUS_TOOL,
            "Check a background task started with `task`. Omit task_id to list all tasks.",
            RiskLevel::Safe,
        )
        .with_domain("agent")
        .with_parameter(ToolParameter::new("task_id", "Id returned by `task`", false))
    }

    pub fn into_spec(self) -> ToolSpec {
        ToolSpec::new(Self::definition(), Arc::new(self))
    }
}

#[async_trait]
impl ToolHandler for TaskStatusTool {
    async fn call(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<String, ToolError> {
        let tasks = self.delegator.tasks();
        match call.get_string("task_id") {
            Some(id) => {
                let record = tasks
                    .get(&TaskId::new(id))
                    .await
                    .ok_or_else(|| ToolError::not_found(format!("task '{}'", id)))?;
                to_json(&record)
            }
            None => to_json(&tasks.list().await),
        }
    }
}

/// Cancels a running background task.
pub struct TaskCancelTool {
    delegator: Arc<TaskDelegator>,
}

impl TaskCancelTool {
    pub fn new(delegator: Arc<TaskDelegator>) -> Self {
        Self { delegator }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            TASK_CANCEL_TOOL,
            "Cancel a running background task. Finished tasks are left as they are.",
            RiskLevel::Moderate,
        )
        .with_domain("agent")
        .with_parameter(ToolParameter::new("task_id", "Id returned by `task`", true))
    }

    pub fn into_spec(self) -> ToolSpec {
        ToolSpec::new(Self::definition(), Arc::new(self))
    }
}

#[async_trait]
impl ToolHandler for TaskCancelTool {
    async fn call(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<String, ToolError> {
        let id = call
            .require_string("task_id")
            .map_err(ToolError::invalid_argument)?;
        let record = self
            .delegator
            .tasks()
            .cancel(&TaskId::new(id))
            .await
            .ok_or_else(|| ToolError::not_found(format!("task '{}'", id)))?;
        to_json(&record)
    }
}

impl TaskDelegator {
    /// The three delegation capabilities, sharing this delegator.
    pub fn tool_specs(self: &Arc<Self>) -> Vec<ToolSpec> {
        vec![
            TaskTool::new(Arc::clone(self)).into_spec(),
            TaskStatusTool::new(Arc::clone(self)).into_spec(),
            TaskCancelTool::new(Arc::clone(self)).into_spec(),
        ]
    }
}
