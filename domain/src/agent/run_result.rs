//! Terminal state of a run.

use crate::session::response::TokenUsage;
use serde::{Deserialize, Serialize};

/// One entry of the tool-call ledger, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    /// Result text as appended to history (error results carry the error prefix)
    pub result: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

/// The materialized terminal state of a run (Value Object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub answer: String,
    pub ledger: Vec<ToolCallRecord>,
    pub iterations: u32,
    pub duration_ms: u64,
    pub usage: TokenUsage,
}

impl RunResult {
    pub fn error_count(&self) -> usize {
        self.ledger.iter().filter(|r| r.is_error).count()
    }

    /// Names of the tools called, in ledger order.
    pub fn tools_called(&self) -> Vec<&str> {
        self.ledger.iter().map(|r| r.tool_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, is_error: bool) -> ToolCallRecord {
        ToolCallRecord {
            call_id: format!("call_{name}"),
            tool_name: name.to_string(),
            arguments: serde_json::json!({}),
            result: if is_error { "Error: boom".into() } else { "ok".into() },
            is_error,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_ledger_helpers() {
        let result = RunResult {
            answer: "done".into(),
            ledger: vec![record("a", false), record("b", true), record("c", false)],
            iterations: 2,
            ..Default::default()
        };
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.tools_called(), vec!["a", "b", "c"]);
    }
}
