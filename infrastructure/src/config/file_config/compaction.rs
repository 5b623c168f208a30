//! Compaction configuration from TOML (`[compaction]` section)

use super::{ConfigIssue, Severity};
use kestrel_domain::{CompactionPolicy, Model};
use serde::{Deserialize, Serialize};

/// Compaction configuration from TOML.
///
/// # Example
///
/// ```toml
/// [compaction]
/// threshold_tokens = 100000
/// keep_recent_messages = 10
/// summary_model = "claude-haiku-4.5"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCompactionConfig {
    /// Estimated token count above which history is compacted
    pub threshold_tokens: usize,
    /// Messages kept verbatim at the end of the history
    pub keep_recent_messages: usize,
    /// Fast model used for summaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_model: Option<String>,
}

impl Default for FileCompactionConfig {
    fn default() -> Self {
        let policy = CompactionPolicy::default();
        Self {
            threshold_tokens: policy.threshold_tokens(),
            keep_recent_messages: policy.keep_recent(),
            summary_model: None,
        }
    }
}

impl FileCompactionConfig {
    /// Convert to the domain policy, falling back to defaults with warnings
    /// when the values are unusable.
    pub fn to_policy(&self) -> (CompactionPolicy, Vec<ConfigIssue>) {
        let policy = CompactionPolicy::new(self.threshold_tokens, self.keep_recent_messages);
        let problems = policy.validate();
        if problems.is_empty() {
            return (policy, vec![]);
        }
        let issues = problems
            .into_iter()
            .map(|message| ConfigIssue::new(Severity::Warning, "compaction", message))
            .collect();
        (CompactionPolicy::default(), issues)
    }

    pub fn summary_model(&self) -> Model {
        self.summary_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(Model::from)
            .unwrap_or_else(Model::default_summary_model)
    }
}
