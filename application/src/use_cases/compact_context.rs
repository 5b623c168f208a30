//! Context compaction use case
//!
//! Keeps a run's history under the token budget of its
//! [`CompactionPolicy`]. Two tiers:
//!
//! 1. **Summarize**: a fast model condenses the span between the system
//!    message and the recent window into one assistant message.
//! 2. **Truncate**: if summarization fails, returns nothing, or does not
//!    shrink the history, the span is dropped.
//!
//! Either way the system message stays first and the recent window is
//! kept verbatim.

use crate::ports::llm_gateway::{ChatRequest, LlmGateway};
use kestrel_domain::{CompactionPolicy, Message, Model, Role, estimate_tokens};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SUMMARY_SYSTEM_PROMPT: &str = "You compress agent transcripts. Summarize the conversation history concisely while preserving:\n1. The user's goal and any constraints they stated\n2. Decisions made and their reasoning\n3. Tool results that later steps depend on (names, ids, numbers, paths)\n4. Open questions and pending work\n\nWrite the summary only, with no preamble.";

const SUMMARY_HEADER: &str = "[Summary of earlier conversation]";

/// What a compaction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    /// Messages removed from history
    pub cleared: usize,
    /// Messages kept verbatim (`cleared + kept` is the original length)
    pub kept: usize,
    /// Whether a summary message replaced the removed span
    pub summarized: bool,
}

/// Shrinks a history in place when it exceeds the token threshold.
pub struct ContextCompactor {
    gateway: Arc<dyn LlmGateway>,
    policy: CompactionPolicy,
    summary_model: Model,
}

impl ContextCompactor {
    pub fn new(gateway: Arc<dyn LlmGateway>, policy: CompactionPolicy) -> Self {
        Self {
            gateway,
            policy,
            summary_model: Model::default_summary_model(),
        }
    }

    pub fn with_summary_model(mut self, model: Model) -> Self {
        self.summary_model = model;
        self
    }

    pub fn policy(&self) -> &CompactionPolicy {
        &self.policy
    }

    /// Compact `messages` if over budget. Returns `None` when nothing changed.
    pub async fn prune(
        &self,
        messages: &mut Vec<Message>,
        cancel: &CancellationToken,
    ) -> Option<CompactionReport> {
        let window = self.policy.window(messages)?;
        let before = estimate_tokens(messages);
        let span = &messages[window.head..window.recent_start];

        debug!(
            tokens = before,
            threshold = self.policy.threshold_tokens(),
            span = span.len(),
            "History over budget, compacting"
        );

        match self.summarize(span, cancel).await {
            Ok(summary) if !summary.trim().is_empty() => {
                let mut candidate = Vec::with_capacity(window.kept() + 1);
                candidate.extend_from_slice(&messages[..window.head]);
                candidate.push(Message::assistant(format!("{}\n{}", SUMMARY_HEADER, summary.trim())));
                candidate.extend_from_slice(&messages[window.recent_start..]);

                let after = estimate_tokens(&candidate);
                if after < before {
                    *messages = candidate;
                    info!(
                        cleared = window.cleared(),
                        kept = window.kept(),
                        tokens_before = before,
                        tokens_after = after,
                        "Compacted history with summary"
                    );
                    return Some(CompactionReport {
                        cleared: window.cleared(),
                        kept: window.kept(),
                        summarized: true,
                    });
                }
                debug!(before, after, "Summary did not reduce history, truncating instead");
            }
            Ok(_) => debug!("Empty summary, truncating instead"),
            Err(e) if e.is_cancelled() => return None,
            Err(e) => warn!(error = %e, "Summarization failed, truncating history"),
        }

        messages.drain(window.head..window.recent_start);
        info!(
            cleared = window.cleared(),
            kept = window.kept(),
            "Truncated history"
        );
        Some(CompactionReport {
            cleared: window.cleared(),
            kept: window.kept(),
            summarized: false,
        })
    }

    async fn summarize(
        &self,
        span: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String, crate::ports::llm_gateway::GatewayError> {
        let transcript = span
            .iter()
            .map(render_for_summary)
            .collect::<Vec<_>>()
            .join("\n");

        let request = ChatRequest::new(
            self.summary_model.clone(),
            vec![
                Message::system(SUMMARY_SYSTEM_PROMPT),
                Message::user(format!("Messages to summarize:\n{}", transcript)),
            ],
        );
        let response = self.gateway.complete(request, cancel).await?;
        Ok(response.text_content())
    }
}

fn render_for_summary(message: &Message) -> String {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut line = format!("{}: {}", role, message.content);
    for call in &message.tool_calls {
        line.push_str(&format!("\n  -> {}({})", call.tool_name, call.arguments_json()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedLlm, Step, text};
    use kestrel_domain::{LlmResponse, ToolCall};

    fn long_history(pairs: usize) -> Vec<Message> {
        let mut messages = vec![Message::system("sys"), Message::user("go")];
        for i in 0..pairs {
            let id = format!("c{i}");
            messages.push(Message::assistant_with_tool_calls(
                "working",
                vec![ToolCall::new("echo").with_id(&id)],
            ));
            messages.push(Message::tool_result(id, "x".repeat(400)));
        }
        messages
    }

    fn compactor(llm: Arc<ScriptedLlm>) -> ContextCompactor {
        ContextCompactor::new(llm, CompactionPolicy::new(500, 10))
    }

    #[tokio::test]
    async fn test_under_threshold_is_noop() {
        let llm = ScriptedLlm::new(vec![]);
        let mut messages = vec![Message::system("sys"), Message::user("hi")];
        let report = ContextCompactor::new(llm.clone(), CompactionPolicy::default())
            .prune(&mut messages, &CancellationToken::new())
            .await;
        assert!(report.is_none());
        assert_eq!(messages.len(), 2);
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn test_short_history_is_noop_over_threshold() {
        let llm = ScriptedLlm::new(vec![]);
        let mut messages = vec![Message::system("sys")];
        messages.extend((0..10).map(|_| Message::user("y".repeat(1000))));
        let report = compactor(llm).prune(&mut messages, &CancellationToken::new()).await;
        assert!(report.is_none());
        assert_eq!(messages.len(), 11);
    }

    #[tokio::test]
    async fn test_summarizes_middle_span() {
        let llm = ScriptedLlm::new(vec![text("user wants echo; 10 calls done")]);
        let mut messages = long_history(10);
        let original = messages.len();

        let report = compactor(llm.clone())
            .prune(&mut messages, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.summarized);
        assert_eq!(report.cleared + report.kept, original);
        assert!(messages[0].is_system());
        assert!(messages[1].content.starts_with(SUMMARY_HEADER));
        assert_eq!(messages.len(), 1 + 1 + 10);
        assert_eq!(llm.requests.lock().unwrap()[0].model, Model::default_summary_model());
    }

    #[tokio::test]
    async fn test_summary_failure_truncates() {
        let llm = ScriptedLlm::new(vec![Step::Fail("overloaded".into())]);
        let mut messages = long_history(10);
        let original = messages.len();

        let report = compactor(llm)
            .prune(&mut messages, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.summarized);
        assert_eq!(report.cleared + report.kept, original);
        assert_eq!(messages.len(), report.kept);
        assert!(messages[0].is_system());
        assert_ne!(messages[1].role, Role::Tool);
    }

    #[tokio::test]
    async fn test_summary_without_reduction_truncates() {
        let bloated = "z".repeat(50_000);
        let llm = ScriptedLlm::new(vec![Step::Respond(LlmResponse::from_text(bloated))]);
        let mut messages = long_history(10);

        let report = compactor(llm)
            .prune(&mut messages, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!report.summarized);
        assert!(messages.iter().all(|m| !m.content.starts_with(SUMMARY_HEADER)));
    }

    #[tokio::test]
    async fn test_empty_summary_truncates() {
        let llm = ScriptedLlm::new(vec![text("   ")]);
        let mut messages = long_history(8);
        let report = compactor(llm)
            .prune(&mut messages, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!report.summarized);
    }

    #[tokio::test]
    async fn test_cancelled_summary_leaves_history() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let notify = Arc::new(tokio::sync::Notify::new());
        let llm = ScriptedLlm::new(vec![Step::WaitFor(notify, LlmResponse::from_text("s"))]);
        let mut messages = long_history(10);
        let original = messages.clone();

        assert!(compactor(llm).prune(&mut messages, &cancel).await.is_none());
        assert_eq!(messages, original);
    }
}
