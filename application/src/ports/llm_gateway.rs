//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers. Transport,
//! retries and provider-specific wire formats live behind this port.

use async_trait::async_trait;
use kestrel_domain::{LlmResponse, Message, Model, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }
}

/// One model call: the full history plus the tool schemas on offer.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: Model,
    pub messages: Vec<Message>,
    /// Provider-neutral JSON schemas (see `JsonSchemaToolConverter`)
    pub tools: Vec<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: Model, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }
}

/// Handle for receiving streaming events from a model call.
#[derive(Debug)]
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event, resolving early if `cancel` fires.
    pub async fn next_event(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamEvent>, GatewayError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            event = self.receiver.recv() => Ok(event),
        }
    }

    /// Consume the stream into a single structured response.
    ///
    /// Text deltas are concatenated; a terminal `CompletedResponse` wins
    /// over accumulated text. A channel closed without a terminal event
    /// yields whatever text arrived.
    pub async fn collect_response(
        mut self,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, GatewayError> {
        let mut full_text = String::new();
        while let Some(event) = self.next_event(cancel).await? {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Completed(text) => {
                    if full_text.is_empty() {
                        full_text = text;
                    }
                    return Ok(LlmResponse::from_text(full_text));
                }
                StreamEvent::CompletedResponse(response) => return Ok(response),
                StreamEvent::Error(e) => return Err(GatewayError::RequestFailed(e)),
            }
        }
        Ok(LlmResponse::from_text(full_text))
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer talks to model providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Start a streaming chat call.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<StreamHandle, GatewayError>;

    /// Non-streaming convenience wrapper around [`stream_chat`](Self::stream_chat).
    async fn complete(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, GatewayError> {
        let handle = self.stream_chat(request, cancel).await?;
        handle.collect_response(cancel).await
    }
}
