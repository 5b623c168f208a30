//! Streaming events for LLM communication.
//!
//! [`StreamEvent`] carries incremental model output from the gateway to the
//! runtime. A stream ends with `Completed`, `CompletedResponse` or `Error`.

use super::response::LlmResponse;

/// An event in a streaming LLM response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),
    /// The complete response text (text-only stream end).
    Completed(String),
    /// An error that occurred during streaming.
    Error(String),
    /// The full structured response, including tool use (stream end).
    CompletedResponse(LlmResponse),
}

impl StreamEvent {
    /// Returns the text content if this is a Delta or Completed event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) | StreamEvent::Completed(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Delta(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(!StreamEvent::Delta("a".into()).is_terminal());
        assert!(StreamEvent::Completed("a".into()).is_terminal());
        assert!(StreamEvent::Error("e".into()).is_terminal());
        assert!(StreamEvent::CompletedResponse(LlmResponse::from_text("x")).is_terminal());
    }

    #[test]
    fn test_text_accessor() {
        assert_eq!(StreamEvent::Delta("hi".into()).text(), Some("hi"));
        assert_eq!(StreamEvent::Error("e".into()).text(), None);
    }
}
