//! `todo_write`: the agent's in-memory task list.
//!
//! Each call replaces the whole list. The tool returns a rendered
//! checklist so the model sees the state it just wrote.

use async_trait::async_trait;
use kestrel_application::{TODO_TOOL, ToolContext, ToolHandler, ToolSpec};
use kestrel_domain::{RiskLevel, ToolCall, ToolDefinition, ToolError, ToolParameter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn marker(&self) -> &str {
        match self {
            TodoStatus::Pending => "[ ]",
            TodoStatus::InProgress => "[~]",
            TodoStatus::Completed => "[x]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
}

#[derive(Debug, Default)]
pub struct TodoWriteTool {
    items: Mutex<Vec<TodoItem>>,
}

impl TodoWriteTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            TODO_TOOL,
            "Replace the task list for the current session. Pass every item each time; \
             status is one of pending, in_progress, completed.",
            RiskLevel::Moderate,
        )
        .with_domain("agent")
        .with_parameter(
            ToolParameter::new(
                "todos",
                "Array of {content, status} objects",
                true,
            )
            .with_type("array"),
        )
    }

    pub fn into_spec(self) -> ToolSpec {
        ToolSpec::new(Self::definition(), Arc::new(self))
    }

    pub async fn items(&self) -> Vec<TodoItem> {
        self.items.lock().await.clone()
    }
}

fn render(items: &[TodoItem]) -> String {
    if items.is_empty() {
        return "Todo list cleared".to_string();
    }
    let done = items
        .iter()
        .filter(|item| item.status == TodoStatus::Completed)
        .count();
    let mut out = format!("Todo list updated ({}/{} completed)\n", done, items.len());
    for item in items {
        out.push_str(&format!("{} {}\n", item.status.marker(), item.content));
    }
    out.trim_end().to_string()
}

#[async_trait]
impl ToolHandler for TodoWriteTool {
    async fn call(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<String, ToolError> {
        let raw = call
            .arguments
            .get("todos")
            .cloned()
            .ok_or_else(|| ToolError::invalid_argument("Missing 'todos'"))?;
        let items: Vec<TodoItem> = serde_json::from_value(raw)
            .map_err(|e| ToolError::invalid_argument(format!("Invalid todos: {}", e)))?;

        if items.iter().any(|item| item.content.trim().is_empty()) {
            return Err(ToolError::invalid_argument("Todo content cannot be empty"));
        }

        let rendered = render(&items);
        *self.items.lock().await = items;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_application::{ExecutionContext, ProgressSink, ToolRegistry};
    use kestrel_domain::Model;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ToolContext {
        ToolContext {
            execution: ExecutionContext::new(Model::default(), "sys", CancellationToken::new()),
            call_id: "c1".into(),
            progress: ProgressSink::disabled(),
            registry: Arc::new(ToolRegistry::new()),
        }
    }

    #[tokio::test]
    async fn test_write_replaces_list() {
        let tool = TodoWriteTool::new();
        let call = ToolCall::new(TODO_TOOL).with_arg(
            "todos",
            json!([
                {"content": "read config", "status": "completed"},
                {"content": "wire runtime", "status": "in_progress"}
            ]),
        );
        let out = tool.call(&call, &ctx()).await.unwrap();
        assert!(out.contains("(1/2 completed)"));
        assert!(out.contains("[~] wire runtime"));

        let call = ToolCall::new(TODO_TOOL).with_arg("todos", json!([]));
        assert_eq!(tool.call(&call, &ctx()).await.unwrap(), "Todo list cleared");
        assert!(tool.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_status_is_invalid_argument() {
        let call = ToolCall::new(TODO_TOOL)
            .with_arg("todos", json!([{"content": "x", "status": "blocked"}]));
        let err = TodoWriteTool::new().call(&call, &ctx()).await.unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENT");
    }

    #[test]
    fn test_definition_is_moderate() {
        let def = TodoWriteTool::definition();
        assert_eq!(def.name, TODO_TOOL);
        assert_eq!(def.risk_level, Some(RiskLevel::Moderate));
    }
}
