//! Scripted (replay) LLM gateway.
//!
//! Serves pre-recorded model turns in order, with no network transport.
//! Drives the CLI for deterministic runs and end-to-end tests.
//!
//! A replay file is either a bare array of turns or an object with a default
//! queue and optional per-model queues:
//!
//! ```json
//! {
//!   "turns": [
//!     {"content": [{"type": "tool_use", "id": "c1", "name": "task",
//!                   "input": {"description": "scan", "prompt": "..."}}]},
//!     {"content": [{"type": "text", "text": "Done."}]}
//!   ],
//!   "models": {
//!     "claude-haiku-4.5": [{"content": [{"type": "text", "text": "summary"}]}]
//!   }
//! }
//! ```
//!
//! A request for a model with its own queue is served from that queue first.
//! Text blocks are streamed as word-sized deltas followed by the complete
//! structured response.

use async_trait::async_trait;
use kestrel_application::{ChatRequest, GatewayError, LlmGateway, StreamHandle};
use kestrel_domain::{LlmResponse, StreamEvent};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayFile {
    Turns(Vec<LlmResponse>),
    Script {
        #[serde(default)]
        turns: Vec<LlmResponse>,
        #[serde(default)]
        models: HashMap<String, Vec<LlmResponse>>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Cannot read replay file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid replay script: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Queues {
    default: VecDeque<LlmResponse>,
    by_model: HashMap<String, VecDeque<LlmResponse>>,
}

#[derive(Debug, Default)]
pub struct ScriptedLlmGateway {
    queues: Mutex<Queues>,
}

impl ScriptedLlmGateway {
    pub fn new(turns: Vec<LlmResponse>) -> Self {
        Self {
            queues: Mutex::new(Queues {
                default: turns.into(),
                by_model: HashMap::new(),
            }),
        }
    }

    pub fn with_model_turns(mut self, model: impl Into<String>, turns: Vec<LlmResponse>) -> Self {
        self.queues
            .get_mut()
            .by_model
            .insert(model.into(), turns.into());
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        let gateway = match serde_json::from_str::<ReplayFile>(text)? {
            ReplayFile::Turns(turns) => Self::new(turns),
            ReplayFile::Script { turns, models } => models
                .into_iter()
                .fold(Self::new(turns), |gateway, (model, turns)| {
                    gateway.with_model_turns(model, turns)
                }),
        };
        Ok(gateway)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ReplayError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&text)
    }

    /// Turns left across all queues.
    pub async fn remaining(&self) -> usize {
        let queues = self.queues.lock().await;
        queues.default.len() + queues.by_model.values().map(VecDeque::len).sum::<usize>()
    }

    async fn next_turn(&self, model: &str) -> Option<LlmResponse> {
        let mut queues = self.queues.lock().await;
        if let Some(queue) = queues.by_model.get_mut(model)
            && let Some(turn) = queue.pop_front()
        {
            return Some(turn);
        }
        queues.default.pop_front()
    }
}

/// Split text into deltas that each end after a run of whitespace.
fn word_deltas(text: &str) -> Vec<String> {
    let mut deltas = Vec::new();
    let mut current = String::new();
    let mut in_space = false;
    for ch in text.chars() {
        if in_space && !ch.is_whitespace() {
            deltas.push(std::mem::take(&mut current));
        }
        in_space = ch.is_whitespace();
        current.push(ch);
    }
    if !current.is_empty() {
        deltas.push(current);
    }
    deltas
}

#[async_trait]
impl LlmGateway for ScriptedLlmGateway {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<StreamHandle, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let model = request.model.to_string();
        let Some(turn) = self.next_turn(&model).await else {
            return Err(GatewayError::RequestFailed(format!(
                "Replay script has no turn left for model {}",
                model
            )));
        };
        debug!(model = %model, messages = request.messages.len(), "Replaying scripted turn");

        let deltas = word_deltas(&turn.text_content());
        let (tx, rx) = mpsc::channel(deltas.len() + 1);
        tokio::spawn(async move {
            for delta in deltas {
                if tx.send(StreamEvent::Delta(delta)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(StreamEvent::CompletedResponse(turn)).await;
        });
        Ok(StreamHandle::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_domain::{Message, Model};

    fn request(model: &Model) -> ChatRequest {
        ChatRequest::new(model.clone(), vec![Message::user("hi")])
    }

    #[test]
    fn test_word_deltas() {
        assert_eq!(word_deltas("Hello big  world"), vec!["Hello ", "big  ", "world"]);
        assert!(word_deltas("").is_empty());
    }

    #[tokio::test]
    async fn test_streams_deltas_then_response() {
        let gateway = ScriptedLlmGateway::new(vec![LlmResponse::from_text("one two")]);
        let cancel = CancellationToken::new();
        let mut handle = gateway
            .stream_chat(request(&Model::default()), &cancel)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = handle.next_event(&cancel).await.unwrap() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StreamEvent::Delta("one ".into()));
        assert!(matches!(events[2], StreamEvent::CompletedResponse(_)));
    }

    #[tokio::test]
    async fn test_parses_script_with_model_queues() {
        let json = r#"{
            "turns": [{"content": [{"type": "tool_use", "id": "c1", "name": "todo_write",
                        "input": {"todos": []}}]}],
            "models": {"claude-haiku-4.5": [{"content": [{"type": "text", "text": "child"}]}]}
        }"#;
        let gateway = ScriptedLlmGateway::from_json(json).unwrap();
        assert_eq!(gateway.remaining().await, 2);
        let cancel = CancellationToken::new();

        let child = gateway
            .complete(request(&Model::ClaudeHaiku45), &cancel)
            .await
            .unwrap();
        assert_eq!(child.text_content(), "child");

        let parent = gateway
            .complete(request(&Model::default()), &cancel)
            .await
            .unwrap();
        assert_eq!(parent.tool_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_parses_bare_array() {
        let json = r#"[{"content": [{"type": "text", "text": "hi"}]}]"#;
        let gateway = ScriptedLlmGateway::from_json(json).unwrap();
        assert_eq!(gateway.remaining().await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let gateway = ScriptedLlmGateway::new(Vec::new());
        let err = gateway
            .stream_chat(request(&Model::default()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::RequestFailed(_)));
    }
}
