//! Run events emitted by the session runtime.
//!
//! Events are delivered in strict chronological order. Every `ToolStart` is
//! matched by exactly one `ToolEnd` or `ToolError`, and `Done` is always the
//! last event of a completed run.

use super::run_result::RunResult;
use crate::tool::entities::RiskLevel;
use serde::{Deserialize, Serialize};

/// One event of a run (closed set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Text produced alongside tool calls (not the final answer)
    Thinking { text: String },
    ToolStart {
        call_id: String,
        tool: String,
        arguments: serde_json::Value,
    },
    /// Intermediate progress reported by a running tool (e.g. a child run)
    ToolProgress {
        call_id: String,
        tool: String,
        message: String,
    },
    ToolEnd {
        call_id: String,
        tool: String,
        result: String,
        duration_ms: u64,
    },
    ToolError {
        call_id: String,
        tool: String,
        error: String,
        duration_ms: u64,
    },
    PermissionRequest {
        call_id: String,
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        risk_level: Option<RiskLevel>,
    },
    PermissionResponse {
        call_id: String,
        tool: String,
        approved: bool,
    },
    /// History was compacted
    ContextCleared { cleared: usize, kept: usize },
    AnswerStart,
    AnswerChunk { text: String },
    /// Run-level failure (e.g. model transport); followed by `Done`
    Error { message: String },
    Done { result: RunResult },
}

impl RunEvent {
    /// Stable snake_case name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Thinking { .. } => "thinking",
            RunEvent::ToolStart { .. } => "tool_start",
            RunEvent::ToolProgress { .. } => "tool_progress",
            RunEvent::ToolEnd { .. } => "tool_end",
            RunEvent::ToolError { .. } => "tool_error",
            RunEvent::PermissionRequest { .. } => "permission_request",
            RunEvent::PermissionResponse { .. } => "permission_response",
            RunEvent::ContextCleared { .. } => "context_cleared",
            RunEvent::AnswerStart => "answer_start",
            RunEvent::AnswerChunk { .. } => "answer_chunk",
            RunEvent::Error { .. } => "error",
            RunEvent::Done { .. } => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Done { .. })
    }

    pub fn as_result(&self) -> Option<&RunResult> {
        match self {
            RunEvent::Done { result } => Some(result),
            _ => None,
        }
    }
}
