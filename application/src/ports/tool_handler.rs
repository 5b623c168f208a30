//! Tool Handler port
//!
//! A [`ToolHandler`] is the executor half of a tool specification. The
//! registry pairs it with a `ToolDefinition`; the runtime calls it with a
//! validated [`ToolCall`] and a per-call [`ToolContext`].

use crate::ports::event_logger::EventSink;
use crate::tools::registry::ToolRegistry;
use async_trait::async_trait;
use kestrel_domain::{Model, RunEvent, ToolCall, ToolError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run-scoped execution context, shared by every call of one run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub cancel: CancellationToken,
    pub model: Model,
    pub system_prompt: String,
    /// Number of delegation levels active above this run
    pub delegation_depth: u32,
}

impl ExecutionContext {
    pub fn new(model: Model, system_prompt: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            model,
            system_prompt: system_prompt.into(),
            delegation_depth: 0,
        }
    }

    pub fn with_delegation_depth(mut self, depth: u32) -> Self {
        self.delegation_depth = depth;
        self
    }
}

/// Emits `ToolProgress` events for the call currently executing.
#[derive(Clone, Default)]
pub struct ProgressSink {
    call_id: String,
    tool: String,
    sink: Option<EventSink>,
}

impl ProgressSink {
    pub fn new(
        call_id: impl Into<String>,
        tool: impl Into<String>,
        sink: EventSink,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            sink: Some(sink),
        }
    }

    /// A sink that drops every report
    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn report(&self, message: impl Into<String>) {
        if let Some(sink) = &self.sink {
            sink.emit(RunEvent::ToolProgress {
                call_id: self.call_id.clone(),
                tool: self.tool.clone(),
                message: message.into(),
            })
            .await;
        }
    }
}

/// Everything a handler may use while executing one call.
#[derive(Clone)]
pub struct ToolContext {
    pub execution: ExecutionContext,
    pub call_id: String,
    pub progress: ProgressSink,
    /// The registry snapshot the current run was bound with
    pub registry: Arc<ToolRegistry>,
}

impl ToolContext {
    pub fn cancel(&self) -> &CancellationToken {
        &self.execution.cancel
    }

    pub fn delegation_depth(&self) -> u32 {
        self.execution.delegation_depth
    }
}

/// Port for tool execution.
///
/// Returns the result text on success. Text starting with the reserved error
/// prefix is still treated as a failure by the runtime; `Err` is rendered
/// into such text.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError>;
}
