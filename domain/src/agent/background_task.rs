//! Background task records.
//!
//! A record is created in `Running` when a delegation is detached and is
//! moved to `Completed` or `Failed` exactly once by its owning child run.

use super::run_result::RunResult;
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a background task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle record of a detached delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundTaskRecord {
    pub id: TaskId,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundTaskRecord {
    pub fn running(id: TaskId, description: impl Into<String>, agent: Option<String>) -> Self {
        Self {
            id,
            description: description.into(),
            agent,
            status: TaskStatus::Running,
            started_at: Utc::now(),
            answer: None,
            iterations: None,
            duration_ms: None,
            error: None,
        }
    }

    fn ensure_running(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::IllegalTaskTransition {
                task_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Running → Completed with the child's result
    pub fn complete(&mut self, result: &RunResult) -> Result<(), DomainError> {
        self.ensure_running()?;
        self.status = TaskStatus::Completed;
        self.answer = Some(result.answer.clone());
        self.iterations = Some(result.iterations);
        self.duration_ms = Some(result.duration_ms);
        Ok(())
    }

    /// Running → Failed with an error string
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_running()?;
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        let elapsed = Utc::now() - self.started_at;
        self.duration_ms = Some(elapsed.num_milliseconds().max(0) as u64);
        Ok(())
    }
}
