//! Command-backed plugin tools.
//!
//! A [`CommandTool`] runs a manifest's command template through the
//! platform shell. Argument values are shell-escaped before substitution:
//! single-quote wrapping on Unix, double-quote wrapping with character
//! escaping on Windows.
//!
//! The child process is killed when the run is cancelled or the manifest's
//! timeout elapses. A non-zero exit status is a tool failure.

use super::manifest::ToolManifest;
use async_trait::async_trait;
use kestrel_application::{ToolContext, ToolHandler};
use kestrel_domain::{ToolCall, ToolError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Maximum output size (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Tool backed by a shell command template.
#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    command_template: String,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl CommandTool {
    pub fn from_manifest(manifest: &ToolManifest) -> Self {
        Self {
            name: manifest.name.clone(),
            command_template: manifest.command.clone(),
            timeout: Duration::from_secs(manifest.timeout_secs),
            working_dir: None,
        }
    }

    /// Set the working directory for command execution.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Build the final command string by substituting parameters.
    ///
    /// `{param_name}` placeholders are replaced with shell-escaped argument values.
    /// Missing optional parameters are replaced with empty strings.
    fn build_command(&self, call: &ToolCall) -> String {
        render_template(&self.command_template, |name| {
            call.arguments.get(name).map(|value| match value {
                serde_json::Value::String(s) => shell_escape(s),
                other => shell_escape(&other.to_string()),
            })
        })
    }

    async fn execute(&self, command_str: &str, ctx: &ToolContext) -> Result<String, ToolError> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command_str]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command_str]);
            c
        };

        if let Some(dir) = &self.working_dir
            && dir.is_dir()
        {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            ToolError::execution_failed(format!("Failed to execute command: {}", e))
        })?;

        // Dropping the output future kills the child (kill_on_drop).
        let output = tokio::select! {
            biased;
            _ = ctx.cancel().cancelled() => return Err(ToolError::cancelled()),
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                Ok(output) => output.map_err(|e| {
                    ToolError::execution_failed(format!("Failed to read command output: {}", e))
                })?,
                Err(_) => {
                    return Err(ToolError::new(
                        "TIMEOUT",
                        format!("Command timed out after {} seconds", self.timeout.as_secs()),
                    ));
                }
            },
        };

        let mut result_text = String::new();
        append_truncated(&mut result_text, &String::from_utf8_lossy(&output.stdout));
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !result_text.is_empty() {
                result_text.push_str("\n--- stderr ---\n");
            }
            append_truncated(&mut result_text, &stderr);
        }

        if output.status.success() {
            if result_text.is_empty() {
                result_text = "Command completed successfully (no output)".to_string();
            }
            Ok(result_text)
        } else {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            Err(ToolError::execution_failed(format!(
                "Command exited with code {}\n{}",
                code, result_text
            )))
        }
    }
}

#[async_trait]
impl ToolHandler for CommandTool {
    async fn call(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let command = self.build_command(call);
        debug!(tool = %self.name, command = %command, "Running command tool");
        self.execute(&command, ctx).await
    }
}

fn append_truncated(out: &mut String, text: &str) {
    if text.len() <= MAX_OUTPUT_SIZE {
        out.push_str(text);
        return;
    }
    let mut end = MAX_OUTPUT_SIZE;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    out.push_str(&text[..end]);
    out.push_str("\n... (output truncated)");
}

/// Expand `{word}` placeholders in a single left-to-right pass.
///
/// Substituted text is never rescanned. Unknown placeholders expand to
/// nothing; braces that do not form a placeholder are kept as written.
fn render_template(template: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after.find('}').map(|close| &after[..close]).filter(|name| {
            !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
        match placeholder {
            Some(name) => {
                if let Some(value) = lookup(name) {
                    result.push_str(&value);
                }
                rest = &after[name.len() + 1..];
            }
            None => {
                result.push('{');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Escape a string for safe shell substitution.
fn shell_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/')
    {
        return s.to_string();
    }

    if cfg!(target_os = "windows") {
        shell_escape_windows(s)
    } else {
        shell_escape_unix(s)
    }
}

/// Unix shell escape: wrap in single quotes, escape internal single quotes.
fn shell_escape_unix(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 4);
    escaped.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// Windows cmd.exe escape: wrap in double quotes, escape `"`, `%`, and `!`.
fn shell_escape_windows(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 4);
    escaped.push('"');
    for ch in s.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '%' => escaped.push_str("%%"),
            '!' => escaped.push_str("^!"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('"');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_application::{ExecutionContext, ProgressSink, ToolRegistry};
    use kestrel_domain::Model;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn tool(command: &str) -> CommandTool {
        let manifest = ToolManifest::parse(&format!(
            "name = \"t\"\ndescription = \"d\"\ncommand = {:?}\ntimeout_secs = 5\n",
            command
        ))
        .unwrap();
        CommandTool::from_manifest(&manifest)
    }

    fn ctx(cancel: CancellationToken) -> ToolContext {
        ToolContext {
            execution: ExecutionContext::new(Model::default(), "sys", cancel),
            call_id: "c1".into(),
            progress: ProgressSink::disabled(),
            registry: Arc::new(ToolRegistry::new()),
        }
    }

    #[test]
    fn test_shell_escape_unix() {
        assert_eq!(shell_escape_unix("hello"), "'hello'");
        assert_eq!(shell_escape_unix("it's"), "'it'\\''s'");
        assert_eq!(shell_escape_unix("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_shell_escape_windows() {
        assert_eq!(shell_escape_windows("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(shell_escape_windows("100%"), "\"100%%\"");
    }

    #[test]
    fn test_shell_escape_plain_values_untouched() {
        assert_eq!(shell_escape("src/main.rs"), "src/main.rs");
        assert_ne!(shell_escape(""), "");
    }

    #[test]
    fn test_build_command_substitutes_and_strips() {
        let tool = tool("grep {pattern} {path} {json}");
        let call = ToolCall::new("t").with_arg("pattern", "fn main");
        let command = tool.build_command(&call);
        assert!(command.starts_with("grep "));
        assert!(command.contains("fn main"));
        assert!(!command.contains("{path}"));
        assert!(!command.contains("{json}"));
    }

    #[test]
    fn test_template_keeps_non_placeholders() {
        let none = |_: &str| None;
        assert_eq!(render_template("awk '{print $1}' {file}", none), "awk '{print $1}' ");
        assert_eq!(render_template("echo {unclosed", none), "echo {unclosed");
        assert_eq!(render_template("echo {{x}}", |_| Some("v".into())), "echo {v}");
    }

    #[cfg(unix)]
    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let tool = tool("printf '%s|' {a} {b}");
        let call = ToolCall::new("t")
            .with_arg("a", "{b}")
            .with_arg("b", "x; echo INJECTED");
        assert_eq!(
            tool.build_command(&call),
            "printf '%s|' '{b}' 'x; echo INJECTED'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_placeholder_text_inside_value_survives() {
        let tool = tool("printf '%s' {text}");
        let call = ToolCall::new("t").with_arg("text", "hello {name}");
        assert_eq!(tool.build_command(&call), "printf '%s' 'hello {name}'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_command() {
        let output = tool("echo {word}")
            .call(
                &ToolCall::new("t").with_arg("word", "hi"),
                &ctx(CancellationToken::new()),
            )
            .await
            .unwrap();
        assert_eq!(output.trim(), "hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_value_cannot_break_out_of_quoting() {
        let call = ToolCall::new("t")
            .with_arg("a", "{b}")
            .with_arg("b", "x; echo INJECTED");
        let output = tool("printf '%s|' {a} {b}")
            .call(&call, &ctx(CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(output, "{b}|x; echo INJECTED|");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let err = tool("echo oops >&2; exit 3")
            .call(&ToolCall::new("t"), &ctx(CancellationToken::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code, "EXECUTION_FAILED");
        assert!(err.message.contains("code 3"));
        assert!(err.message.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_kills_command() {
        let cancel = CancellationToken::new();
        let context = ctx(cancel.clone());
        let tool = tool("sleep 30");
        let handle = tokio::spawn(async move { tool.call(&ToolCall::new("t"), &context).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
