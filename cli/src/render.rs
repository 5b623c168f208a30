//! Plain-text rendering of run events and task notifications.
//!
//! Answer text goes to stdout; everything else goes to stderr so the answer
//! can be piped.

use kestrel_application::TaskNotification;
use kestrel_domain::{RunEvent, RunResult};
use std::io::Write;

const PREVIEW_CHARS: usize = 200;

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        out.push_str(" ...");
    }
    out
}

/// Render one event, or `None` for events that print nothing.
pub fn format_event(event: &RunEvent) -> Option<String> {
    let line = match event {
        RunEvent::Thinking { text } => format!("  {}", preview(text)),
        RunEvent::ToolStart {
            tool, arguments, ..
        } => format!("-> {} {}", tool, arguments),
        RunEvent::ToolProgress { tool, message, .. } => format!("   [{}] {}", tool, message),
        RunEvent::ToolEnd {
            tool,
            result,
            duration_ms,
            ..
        } => format!("<- {} ({}ms) {}", tool, duration_ms, preview(result)),
        RunEvent::ToolError {
            tool,
            error,
            duration_ms,
            ..
        } => format!("<- {} failed ({}ms) {}", tool, duration_ms, preview(error)),
        RunEvent::PermissionRequest {
            tool, risk_level, ..
        } => match risk_level {
            Some(risk) => format!("?? permission requested for {} ({})", tool, risk.as_str()),
            None => format!("?? permission requested for {}", tool),
        },
        RunEvent::PermissionResponse { tool, approved, .. } => format!(
            "?? {} {}",
            tool,
            if *approved { "approved" } else { "declined" }
        ),
        RunEvent::ContextCleared { cleared, kept } => {
            format!("~~ context compacted: {} messages cleared, {} kept", cleared, kept)
        }
        RunEvent::Error { message } => format!("!! {}", message),
        RunEvent::AnswerStart | RunEvent::AnswerChunk { .. } | RunEvent::Done { .. } => {
            return None;
        }
    };
    Some(line)
}

pub fn format_summary(result: &RunResult) -> String {
    format!(
        "{} iteration(s), {} tool call(s) ({} failed), {} tokens, {}ms",
        result.iterations,
        result.ledger.len(),
        result.error_count(),
        result.usage.total_tokens,
        result.duration_ms
    )
}

pub fn format_notification(notification: &TaskNotification) -> String {
    match notification {
        TaskNotification::Started {
            task_id,
            description,
        } => format!("[{}] started: {}", task_id, description),
        TaskNotification::Progress { task_id, message } => format!("[{}] {}", task_id, message),
        TaskNotification::Completed { task_id, answer } => {
            format!("[{}] completed: {}", task_id, preview(answer))
        }
        TaskNotification::Failed { task_id, error } => format!("[{}] failed: {}", task_id, error),
    }
}

/// Streams events to the terminal.
#[derive(Default)]
pub struct EventPrinter {
    answering: bool,
}

impl EventPrinter {
    pub fn print(&mut self, event: &RunEvent) {
        match event {
            RunEvent::AnswerStart => {
                self.answering = true;
            }
            RunEvent::AnswerChunk { text } => {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            RunEvent::Done { result } => {
                if self.answering {
                    println!();
                }
                eprintln!("-- {}", format_summary(result));
            }
            other => {
                if let Some(line) = format_event(other) {
                    eprintln!("{}", line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_domain::{RiskLevel, TaskId};

    #[test]
    fn test_tool_lines() {
        let start = RunEvent::ToolStart {
            call_id: "c1".into(),
            tool: "todo_write".into(),
            arguments: serde_json::json!({"todos": []}),
        };
        assert_eq!(
            format_event(&start).unwrap(),
            r#"-> todo_write {"todos":[]}"#
        );

        let failed = RunEvent::ToolError {
            call_id: "c1".into(),
            tool: "deploy".into(),
            error: "Error: [PERMISSION_DENIED] nope".into(),
            duration_ms: 3,
        };
        assert!(format_event(&failed).unwrap().contains("failed (3ms)"));
    }

    #[test]
    fn test_permission_request_shows_risk() {
        let event = RunEvent::PermissionRequest {
            call_id: "c1".into(),
            tool: "deploy".into(),
            risk_level: Some(RiskLevel::Dangerous),
        };
        assert!(format_event(&event).unwrap().ends_with("(dangerous)"));
    }

    #[test]
    fn test_answer_events_are_not_lines() {
        assert!(format_event(&RunEvent::AnswerStart).is_none());
        assert!(format_event(&RunEvent::AnswerChunk { text: "x".into() }).is_none());
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("one\ntwo"), "one ...");
        assert_eq!(preview(&"a".repeat(300)).chars().count(), PREVIEW_CHARS + 4);
    }

    #[test]
    fn test_notification_line() {
        let line = format_notification(&TaskNotification::Completed {
            task_id: TaskId::new("task_1"),
            answer: "found 3 issues".into(),
        });
        assert_eq!(line, "[task_1] completed: found 3 issues");
    }
}
