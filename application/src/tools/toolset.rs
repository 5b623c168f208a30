//! A registry bound to one run.
//!
//! [`BoundToolset`] is what the runtime hands the model (schemas) and what
//! it dispatches calls through. Unknown tools, schema violations, handler
//! failures and cancellation all come back as error text rather than
//! errors, so a single bad call never ends the run.

use super::registry::ToolRegistry;
use super::schema::JsonSchemaToolConverter;
use crate::ports::tool_handler::{ExecutionContext, ProgressSink, ToolContext};
use kestrel_domain::{DefaultToolValidator, ToolCall, ToolError, ToolValidator, is_error_output};
use std::sync::Arc;

/// Text result of one call, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub output: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn from_output(output: String) -> Self {
        let is_error = is_error_output(&output);
        Self { output, is_error }
    }

    pub fn from_error(error: &ToolError) -> Self {
        Self {
            output: error.to_output(),
            is_error: true,
        }
    }
}

/// Model-callable view of a registry for one run
pub struct BoundToolset {
    registry: Arc<ToolRegistry>,
    execution: ExecutionContext,
    schemas: Vec<serde_json::Value>,
}

impl ToolRegistry {
    /// Bind a registry snapshot to a run's execution context.
    pub fn bind(self: &Arc<Self>, execution: ExecutionContext) -> BoundToolset {
        BoundToolset {
            schemas: JsonSchemaToolConverter::registry_schema(self),
            registry: Arc::clone(self),
            execution,
        }
    }
}

impl BoundToolset {
    /// JSON schemas offered to the model, sorted by name
    pub fn schemas(&self) -> &[serde_json::Value] {
        &self.schemas
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    /// Validate and execute a call.
    pub async fn call(&self, call: &ToolCall, progress: ProgressSink) -> ToolOutcome {
        let Some(spec) = self.registry.get(&call.tool_name) else {
            return ToolOutcome::from_error(&ToolError::not_found(format!(
                "tool '{}'",
                call.tool_name
            )));
        };

        if let Err(message) = DefaultToolValidator.validate(call, &spec.definition) {
            return ToolOutcome::from_error(&ToolError::invalid_argument(message));
        }

        let ctx = ToolContext {
            execution: self.execution.clone(),
            call_id: call.id.clone(),
            progress,
            registry: Arc::clone(&self.registry),
        };

        let cancel = self.execution.cancel.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::cancelled()),
            result = spec.handler.call(call, &ctx) => result,
        };

        match result {
            Ok(output) => ToolOutcome::from_output(output),
            Err(error) => ToolOutcome::from_error(&error),
        }
    }
}
