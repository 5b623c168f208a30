//! Tool domain value objects - error type and result-text conventions
//!
//! Executors hand back plain text. Failures are rendered through
//! [`ToolError::to_output`] so they begin with [`ERROR_PREFIX`], which is
//! how the runtime tells a failed result from a successful one.

use serde::{Deserialize, Serialize};

/// Reserved prefix marking a tool result as a failure.
pub const ERROR_PREFIX: &str = "Error:";

/// Returns true if a tool's text result denotes a failure.
pub fn is_error_output(output: &str) -> bool {
    output.trim_start().starts_with(ERROR_PREFIX)
}

/// Error that occurred during tool execution.
///
/// | Code | Description |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Missing/wrong parameters |
/// | `NOT_FOUND` | Unknown tool or resource |
/// | `EXECUTION_FAILED` | Runtime failure (process error, child run failure) |
/// | `PERMISSION_DENIED` | Blocked by the permission gateway or a hook |
/// | `CANCELLED` | The run's cancellation signal fired |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "PERMISSION_DENIED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Common error constructors
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new("PERMISSION_DENIED", message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn cancelled() -> Self {
        Self::new("CANCELLED", "Operation cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == "CANCELLED"
    }

    /// Render as tool result text carrying the reserved error prefix.
    pub fn to_output(&self) -> String {
        format!("{} {}", ERROR_PREFIX, self)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error() {
        let err = ToolError::not_found("task abc").with_details("never started");

        assert_eq!(err.code, "NOT_FOUND");
        assert!(err.message.contains("task abc"));
        assert_eq!(err.to_string(), "[NOT_FOUND] Resource not found: task abc (never started)");
    }

    #[test]
    fn test_to_output_is_recognised_as_error() {
        let output = ToolError::permission_denied("denied by policy").to_output();
        assert!(output.starts_with("Error: [PERMISSION_DENIED]"));
        assert!(is_error_output(&output));
    }

    #[test]
    fn test_is_error_output() {
        assert!(is_error_output("Error: boom"));
        assert!(is_error_output("  Error: leading whitespace"));
        assert!(!is_error_output("No Error: here"));
        assert!(!is_error_output("ok"));
    }

    #[test]
    fn test_cancelled() {
        assert!(ToolError::cancelled().is_cancelled());
        assert!(!ToolError::execution_failed("x").is_cancelled());
    }
}
