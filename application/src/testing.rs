//! Test doubles shared by the application crate's unit tests.

use crate::ports::llm_gateway::{ChatRequest, GatewayError, LlmGateway, StreamHandle};
use crate::ports::tool_handler::{ToolContext, ToolHandler};
use crate::tools::registry::ToolSpec;
use async_trait::async_trait;
use kestrel_domain::{
    LlmResponse, Model, RiskLevel, RunEvent, StreamEvent, ToolCall, ToolDefinition, ToolError,
    ToolParameter,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

/// Returns its `text` argument.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<String, ToolError> {
        Ok(call.get_string("text").unwrap_or("echo").to_string())
    }
}

pub fn echo_spec(name: &str) -> ToolSpec {
    ToolSpec::new(
        ToolDefinition::new(name, format!("Echo tool {name}"), RiskLevel::Safe)
            .with_parameter(ToolParameter::new("text", "Text to echo", false)),
        Arc::new(EchoTool),
    )
}

/// Call-count spy returning a fixed output.
pub struct CountingTool {
    output: String,
    calls: AtomicUsize,
}

impl CountingTool {
    pub fn new(output: &str) -> Arc<Self> {
        Arc::new(Self {
            output: output.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolHandler for CountingTool {
    async fn call(&self, _call: &ToolCall, _ctx: &ToolContext) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

pub fn counting_spec(name: &str, risk: RiskLevel, tool: Arc<CountingTool>) -> ToolSpec {
    ToolSpec::new(ToolDefinition::new(name, "Counting tool", risk), tool)
}

/// One scripted model turn.
pub enum Step {
    Respond(LlmResponse),
    Fail(String),
    /// Respond only after the notify fires (or never, if cancelled first)
    WaitFor(Arc<Notify>, LlmResponse),
}

pub fn text(s: &str) -> Step {
    Step::Respond(LlmResponse::from_text(s))
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> Step {
    Step::Respond(LlmResponse::from_text("").with_tool_use(id, name, input))
}

/// Scripted gateway with one queue per model name and a fallback queue.
///
/// Text is streamed word by word, followed by the full structured response.
#[derive(Default)]
pub struct ScriptedLlm {
    by_model: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<VecDeque<Step>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            fallback: Mutex::new(steps.into()),
            ..Default::default()
        })
    }

    pub fn with_model(self: Arc<Self>, model: &Model, steps: Vec<Step>) -> Arc<Self> {
        self.by_model
            .lock()
            .unwrap()
            .insert(model.to_string(), steps.into());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_step(&self, model: &Model) -> Step {
        if let Some(queue) = self.by_model.lock().unwrap().get_mut(model.as_str())
            && let Some(step) = queue.pop_front()
        {
            return step;
        }
        self.fallback
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| text("(script exhausted)"))
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<StreamHandle, GatewayError> {
        let step = self.next_step(&request.model);
        self.requests.lock().unwrap().push(request);

        let (gate, response) = match step {
            Step::Fail(message) => return Err(GatewayError::RequestFailed(message)),
            Step::Respond(response) => (None, response),
            Step::WaitFor(notify, response) => (Some(notify), response),
        };

        let (tx, rx) = mpsc::channel(64);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Some(notify) = gate {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = notify.notified() => {}
                }
            }
            for word in response.text_content().split_inclusive(' ') {
                let _ = tx.send(StreamEvent::Delta(word.to_string())).await;
            }
            let _ = tx.send(StreamEvent::CompletedResponse(response)).await;
        });
        Ok(StreamHandle::new(rx))
    }
}

/// Names of the events, for compact sequence assertions.
pub fn names(events: &[RunEvent]) -> Vec<&'static str> {
    events.iter().map(RunEvent::name).collect()
}
