//! RunSession use case
//!
//! The session runtime drives one conversation with the model:
//!
//! ```text
//! seed [system, user]
//!   └─ loop (≤ max_iterations)
//!        ├─ stream model turn
//!        ├─ no tool calls → answer_start, answer_chunk…, break
//!        ├─ thinking (if text accompanied the calls)
//!        ├─ per call, in request order:
//!        │    permission → pre-hook → execute → post-hook → end/error
//!        └─ compaction (context_cleared when it shrank history)
//! done
//! ```
//!
//! Every event goes through one [`EventSink`]; `done` is always the last one.

mod types;

pub use types::{RunError, RunHandle};

use crate::config::RuntimeConfig;
use crate::ports::event_logger::{EventLogger, EventSink, NoEventLogger};
use crate::ports::hook_gateway::{HookEvent, HookGateway, NoHooks};
use crate::ports::llm_gateway::{ChatRequest, GatewayError, LlmGateway};
use crate::ports::permission_gateway::{
    AllowAllPermissions, PermissionDecision, PermissionGateway,
};
use crate::ports::tool_handler::{ExecutionContext, ProgressSink};
use crate::tools::{BoundToolset, ToolOutcome, ToolRegistry};
use crate::use_cases::compact_context::ContextCompactor;
use crate::use_cases::shared::check_cancelled;
use kestrel_domain::{
    CompactionPolicy, LlmResponse, Message, RunEvent, RunResult, StreamEvent, ToolCall,
    ToolCallRecord, ToolError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the per-run event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Executes runs against one model gateway and one tool registry.
#[derive(Clone)]
pub struct SessionRuntime {
    gateway: Arc<dyn LlmGateway>,
    registry: Arc<ToolRegistry>,
    permissions: Arc<dyn PermissionGateway>,
    hooks: Arc<dyn HookGateway>,
    compactor: Arc<ContextCompactor>,
    event_logger: Arc<dyn EventLogger>,
    config: RuntimeConfig,
    delegation_depth: u32,
}

/// What one streamed model turn produced
struct Turn {
    response: LlmResponse,
    chunks: Vec<String>,
}

impl Turn {
    fn text(&self) -> String {
        let streamed: String = self.chunks.concat();
        if streamed.is_empty() {
            self.response.text_content()
        } else {
            streamed
        }
    }
}

impl SessionRuntime {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        registry: Arc<ToolRegistry>,
        config: RuntimeConfig,
    ) -> Self {
        let compactor = Arc::new(ContextCompactor::new(
            gateway.clone(),
            CompactionPolicy::default(),
        ));
        Self {
            gateway,
            registry,
            permissions: Arc::new(AllowAllPermissions),
            hooks: Arc::new(NoHooks),
            compactor,
            event_logger: Arc::new(NoEventLogger),
            config,
            delegation_depth: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionGateway>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookGateway>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_compactor(mut self, compactor: Arc<ContextCompactor>) -> Self {
        self.compactor = compactor;
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.event_logger = logger;
        self
    }

    pub fn with_delegation_depth(mut self, depth: u32) -> Self {
        self.delegation_depth = depth;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn delegation_depth(&self) -> u32 {
        self.delegation_depth
    }

    /// Start a run on a new task and return its event stream.
    pub fn start_run(&self, input: impl Into<String>, cancel: CancellationToken) -> RunHandle {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let sink = EventSink::new(tx, self.event_logger.clone());
        let runtime = self.clone();
        let input = input.into();
        let join = tokio::spawn(async move { runtime.run(&input, &cancel, &sink).await });
        RunHandle::new(rx, join)
    }

    /// Execute a run to completion, emitting events into `sink`.
    pub async fn run(
        &self,
        input: &str,
        cancel: &CancellationToken,
        sink: &EventSink,
    ) -> Result<RunResult, RunError> {
        let started = Instant::now();
        let execution = ExecutionContext::new(
            self.config.model.clone(),
            self.config.system_prompt.clone(),
            cancel.clone(),
        )
        .with_delegation_depth(self.delegation_depth);
        let toolset = self.registry.bind(execution);

        let mut messages = vec![
            Message::system(self.config.system_prompt.clone()),
            Message::user(input),
        ];
        let mut result = RunResult::default();
        let mut last_text = String::new();
        let mut answered = false;

        info!(
            model = %self.config.model,
            tools = self.registry.len(),
            depth = self.delegation_depth,
            max_iterations = self.config.max_iterations,
            "Run started"
        );

        while result.iterations < self.config.max_iterations {
            check_cancelled(cancel)?;
            result.iterations += 1;
            debug!(iteration = result.iterations, messages = messages.len(), "Model turn");

            let request = ChatRequest::new(self.config.model.clone(), messages.clone())
                .with_tools(toolset.schemas().to_vec());
            let turn = match self.stream_turn(request, cancel).await {
                Ok(turn) => turn,
                Err(e) if e.is_cancelled() => return Err(RunError::Cancelled),
                Err(e) => return Err(self.fail(e, result, started, sink).await),
            };

            if let Some(usage) = &turn.response.usage {
                result.usage.add(usage);
            }

            let text = turn.text();
            let calls = turn.response.tool_calls();

            if calls.is_empty() {
                sink.emit(RunEvent::AnswerStart).await;
                if !turn.chunks.is_empty() {
                    for chunk in turn.chunks {
                        sink.emit(RunEvent::AnswerChunk { text: chunk }).await;
                    }
                } else if !text.is_empty() {
                    sink.emit(RunEvent::AnswerChunk { text: text.clone() }).await;
                }
                result.answer = text;
                answered = true;
                break;
            }

            if !text.is_empty() {
                sink.emit(RunEvent::Thinking { text: text.clone() }).await;
                last_text = text.clone();
            }
            messages.push(Message::assistant_with_tool_calls(text, calls.clone()));

            for call in &calls {
                let record = self.execute_call(call, &toolset, sink).await;
                check_cancelled(cancel)?;

                let record = record.with_duration();
                if record.is_error {
                    sink.emit(RunEvent::ToolError {
                        call_id: call.id.clone(),
                        tool: call.tool_name.clone(),
                        error: record.result.clone(),
                        duration_ms: record.duration_ms,
                    })
                    .await;
                } else {
                    sink.emit(RunEvent::ToolEnd {
                        call_id: call.id.clone(),
                        tool: call.tool_name.clone(),
                        result: record.result.clone(),
                        duration_ms: record.duration_ms,
                    })
                    .await;
                }
                messages.push(Message::tool_result(call.id.clone(), record.result.clone()));
                result.ledger.push(record.into_record(call));
            }

            if let Some(report) = self.compactor.prune(&mut messages, cancel).await {
                sink.emit(RunEvent::ContextCleared {
                    cleared: report.cleared,
                    kept: report.kept,
                })
                .await;
            }
        }

        if !answered {
            warn!(
                max_iterations = self.config.max_iterations,
                "Iteration limit reached, ending run with last text"
            );
            result.answer = last_text;
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            iterations = result.iterations,
            tool_calls = result.ledger.len(),
            errors = result.error_count(),
            duration_ms = result.duration_ms,
            "Run finished"
        );
        sink.emit(RunEvent::Done {
            result: result.clone(),
        })
        .await;
        Ok(result)
    }

    /// Stream one model turn, keeping the text deltas for answer chunks.
    async fn stream_turn(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Turn, GatewayError> {
        let mut handle = self.gateway.stream_chat(request, cancel).await?;
        let mut chunks = Vec::new();

        while let Some(event) = handle.next_event(cancel).await? {
            match event {
                StreamEvent::Delta(chunk) => {
                    if !chunk.is_empty() {
                        chunks.push(chunk);
                    }
                }
                StreamEvent::Completed(text) => {
                    let full = if chunks.is_empty() { text } else { chunks.concat() };
                    return Ok(Turn {
                        response: LlmResponse::from_text(full),
                        chunks,
                    });
                }
                StreamEvent::CompletedResponse(response) => {
                    return Ok(Turn { response, chunks });
                }
                StreamEvent::Error(e) => return Err(GatewayError::RequestFailed(e)),
            }
        }

        Ok(Turn {
            response: LlmResponse::from_text(chunks.concat()),
            chunks,
        })
    }

    /// Permission, hooks and execution for one call. Emits everything up to
    /// (not including) the end/error event.
    async fn execute_call(
        &self,
        call: &ToolCall,
        toolset: &BoundToolset,
        sink: &EventSink,
    ) -> PendingRecord {
        let arguments = call.arguments_json();
        sink.emit(RunEvent::ToolStart {
            call_id: call.id.clone(),
            tool: call.tool_name.clone(),
            arguments: arguments.clone(),
        })
        .await;
        let started = Instant::now();

        // Unknown tools fall through to the toolset, which reports NOT_FOUND.
        if let Some(spec) = toolset.registry().get(&call.tool_name) {
            let definition = &spec.definition;
            match self.permissions.check(definition) {
                PermissionDecision::Allow => {}
                PermissionDecision::Deny => {
                    info!(tool = %call.tool_name, "Tool call denied by permission rules");
                    return PendingRecord::failed(
                        ToolError::permission_denied(format!(
                            "Permission denied for tool '{}'",
                            call.tool_name
                        )),
                        started,
                    );
                }
                PermissionDecision::Ask => {
                    sink.emit(RunEvent::PermissionRequest {
                        call_id: call.id.clone(),
                        tool: call.tool_name.clone(),
                        risk_level: definition.risk_level,
                    })
                    .await;
                    let approved = self.permissions.confirm(definition);
                    sink.emit(RunEvent::PermissionResponse {
                        call_id: call.id.clone(),
                        tool: call.tool_name.clone(),
                        approved,
                    })
                    .await;
                    if !approved {
                        info!(tool = %call.tool_name, "Tool call declined");
                        return PendingRecord::failed(
                            ToolError::permission_denied(format!(
                                "User declined tool '{}'",
                                call.tool_name
                            )),
                            started,
                        );
                    }
                }
            }

            let payload = json!({
                "event": HookEvent::PreToolUse.as_str(),
                "tool": call.tool_name,
                "call_id": call.id,
                "arguments": arguments,
            });
            let verdict = self.hooks.run(HookEvent::PreToolUse, &payload).await;
            if !verdict.allow {
                let message = verdict
                    .message
                    .unwrap_or_else(|| format!("Blocked by hook: {}", call.tool_name));
                info!(tool = %call.tool_name, reason = %message, "Tool call vetoed by hook");
                return PendingRecord::failed(ToolError::permission_denied(message), started);
            }
        }

        let progress = ProgressSink::new(call.id.clone(), call.tool_name.clone(), sink.clone());
        let outcome = toolset.call(call, progress).await;
        debug!(tool = %call.tool_name, is_error = outcome.is_error, "Tool call finished");

        if toolset.registry().contains(&call.tool_name) && !toolset.execution().cancel.is_cancelled() {
            let payload = json!({
                "event": HookEvent::PostToolUse.as_str(),
                "tool": call.tool_name,
                "call_id": call.id,
                "arguments": arguments,
                "result": outcome.output,
                "is_error": outcome.is_error,
            });
            let verdict = self.hooks.run(HookEvent::PostToolUse, &payload).await;
            if let Some(message) = verdict.message {
                debug!(tool = %call.tool_name, message = %message, "Post-tool hook message");
            }
        }

        PendingRecord::from_outcome(outcome, started)
    }

    /// Report a transport failure: `error`, then `done` with the partial result.
    async fn fail(
        &self,
        error: GatewayError,
        mut partial: RunResult,
        started: Instant,
        sink: &EventSink,
    ) -> RunError {
        warn!(error = %error, iteration = partial.iterations, "Model call failed, ending run");
        partial.duration_ms = started.elapsed().as_millis() as u64;
        let message = error.to_string();
        sink.emit(RunEvent::Error {
            message: message.clone(),
        })
        .await;
        sink.emit(RunEvent::Done {
            result: partial.clone(),
        })
        .await;
        RunError::Gateway {
            message,
            partial: Box::new(partial),
        }
    }
}

/// A call outcome waiting for its duration and ledger entry
struct PendingRecord {
    result: String,
    is_error: bool,
    started: Instant,
    duration_ms: u64,
}

impl PendingRecord {
    fn from_outcome(outcome: ToolOutcome, started: Instant) -> Self {
        Self {
            result: outcome.output,
            is_error: outcome.is_error,
            started,
            duration_ms: 0,
        }
    }

    fn failed(error: ToolError, started: Instant) -> Self {
        Self::from_outcome(ToolOutcome::from_error(&error), started)
    }

    fn with_duration(mut self) -> Self {
        self.duration_ms = self.started.elapsed().as_millis() as u64;
        self
    }

    fn into_record(self, call: &ToolCall) -> ToolCallRecord {
        ToolCallRecord {
            call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            arguments: call.arguments_json(),
            result: self.result,
            is_error: self.is_error,
            duration_ms: self.duration_ms,
        }
    }
}
