//! Compaction policy for the conversation history.
//!
//! When the estimated token cost of the history exceeds the threshold, the
//! history is split into three spans:
//!
//! ```text
//! [system] [ ........ middle ........ ] [ recent window ]
//!  kept     summarized or discarded      kept verbatim
//! ```
//!
//! The recent window never starts with a tool-result message, so a kept
//! tool result is always preceded by the assistant turn that requested it.

use crate::session::entities::{Message, Role};
use serde::{Deserialize, Serialize};

/// Average characters per token used for estimation.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of a message list (chars / 4, rounded up).
pub fn estimate_tokens(messages: &[Message]) -> usize {
    let chars: usize = messages.iter().map(Message::char_len).sum();
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Budget controlling when and how much history is compacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionPolicy {
    threshold_tokens: usize,
    keep_recent: usize,
}

/// Split points of a history selected for compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionWindow {
    /// Number of leading messages always kept (1 when a system message leads)
    pub head: usize,
    /// Index where the verbatim recent window starts
    pub recent_start: usize,
    /// Length of the history the window was computed for
    pub original_len: usize,
}

impl CompactionWindow {
    /// Messages removed from the history
    pub fn cleared(&self) -> usize {
        self.recent_start - self.head
    }

    /// Messages kept verbatim
    pub fn kept(&self) -> usize {
        self.original_len - self.cleared()
    }
}

impl CompactionPolicy {
    /// Default: compact above 100k tokens, keep the last 10 messages (5 tool-use pairs).
    pub const DEFAULT_THRESHOLD_TOKENS: usize = 100_000;
    pub const DEFAULT_KEEP_RECENT: usize = 10;

    pub fn new(threshold_tokens: usize, keep_recent: usize) -> Self {
        Self {
            threshold_tokens,
            keep_recent,
        }
    }

    pub fn threshold_tokens(&self) -> usize {
        self.threshold_tokens
    }

    pub fn keep_recent(&self) -> usize {
        self.keep_recent
    }

    pub fn with_threshold_tokens(mut self, tokens: usize) -> Self {
        self.threshold_tokens = tokens;
        self
    }

    pub fn with_keep_recent(mut self, count: usize) -> Self {
        self.keep_recent = count;
        self
    }

    /// Decide where to cut, or `None` if the history is within budget.
    pub fn window(&self, messages: &[Message]) -> Option<CompactionWindow> {
        if estimate_tokens(messages) <= self.threshold_tokens {
            return None;
        }

        let len = messages.len();
        let head = usize::from(messages.first().is_some_and(Message::is_system));
        if len <= head + self.keep_recent {
            return None;
        }

        let mut recent_start = len - self.keep_recent;
        // With an empty window `recent_start == len`; there is nothing to realign.
        while recent_start > head
            && messages
                .get(recent_start)
                .is_some_and(|m| m.role == Role::Tool)
        {
            recent_start -= 1;
        }
        if recent_start <= head {
            return None;
        }

        Some(CompactionWindow {
            head,
            recent_start,
            original_len: len,
        })
    }

    /// Validate this policy, returning a list of issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.threshold_tokens == 0 {
            issues.push("compaction: threshold_tokens must be > 0".to_string());
        }
        if self.keep_recent < 2 {
            issues.push("compaction: keep_recent_messages must be >= 2".to_string());
        }
        issues
    }
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD_TOKENS, Self::DEFAULT_KEEP_RECENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolCall;

    fn history(pairs: usize, body: &str) -> Vec<Message> {
        let mut messages = vec![Message::system("sys"), Message::user("start")];
        for i in 0..pairs {
            let id = format!("c{i}");
            messages.push(Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("todo_write").with_id(&id)],
            ));
            messages.push(Message::tool_result(id, body));
        }
        messages
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(&[]), 0);
        assert_eq!(estimate_tokens(&[Message::user("abcde")]), 2);
        assert_eq!(estimate_tokens(&[Message::user("abcd")]), 1);
    }

    #[test]
    fn test_defaults() {
        let policy = CompactionPolicy::default();
        assert_eq!(policy.threshold_tokens(), 100_000);
        assert_eq!(policy.keep_recent(), 10);
        assert!(policy.validate().is_empty());
    }

    #[test]
    fn test_under_threshold_is_none() {
        let policy = CompactionPolicy::default();
        assert!(policy.window(&history(20, "short")).is_none());
    }

    #[test]
    fn test_short_history_is_none_even_over_threshold() {
        let policy = CompactionPolicy::new(1, 10);
        // system + 10 messages: nothing outside the retained window
        let mut messages = vec![Message::system("sys")];
        messages.extend((0..10).map(|i| Message::user(format!("message {i}"))));
        assert!(policy.window(&messages).is_none());
    }

    #[test]
    fn test_window_counts_sum_to_original() {
        let policy = CompactionPolicy::new(10, 10);
        let messages = history(10, &"x".repeat(100));
        let window = policy.window(&messages).unwrap();
        assert_eq!(window.head, 1);
        assert_eq!(window.cleared() + window.kept(), messages.len());
        assert_eq!(window.original_len - window.recent_start, 10);
    }

    #[test]
    fn test_recent_window_does_not_start_with_tool_result() {
        let policy = CompactionPolicy::new(10, 9);
        let messages = history(10, &"x".repeat(100));
        let window = policy.window(&messages).unwrap();
        assert_ne!(messages[window.recent_start].role, Role::Tool);
        assert_eq!(window.original_len - window.recent_start, 10);
    }

    #[test]
    fn test_without_system_message() {
        let policy = CompactionPolicy::new(10, 4);
        let messages: Vec<Message> = (0..8).map(|i| Message::user(format!("{i}{}", "y".repeat(50)))).collect();
        let window = policy.window(&messages).unwrap();
        assert_eq!(window.head, 0);
        assert_eq!(window.cleared(), 4);
    }

    #[test]
    fn test_zero_window_clears_everything_after_system() {
        let policy = CompactionPolicy::new(1, 0);
        let messages = history(3, "body");
        let window = policy.window(&messages).unwrap();
        assert_eq!(window.head, 1);
        assert_eq!(window.recent_start, messages.len());
        assert_eq!(window.kept(), 1);
        assert_eq!(window.cleared() + window.kept(), messages.len());
    }

    #[test]
    fn test_validate_issues() {
        let issues = CompactionPolicy::new(0, 1).validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("threshold_tokens"));
    }
}
