//! Background task table.
//!
//! Each background delegation gets one [`BackgroundTaskRecord`] here. A
//! record leaves `running` exactly once: through the child run finishing,
//! failing, or an explicit [`TaskManager::cancel`]. Whichever comes first
//! wins; later transitions are ignored.

use crate::use_cases::run_session::{RunError, SessionRuntime};
use kestrel_domain::{BackgroundTaskRecord, RunEvent, RunResult, TaskId, TaskStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Error text of a task cancelled through [`TaskManager::cancel`]
pub const CANCELLED_BY_USER: &str = "Task cancelled by user";

/// Error text of a task whose parent run was cancelled
pub const CANCELLED_WITH_PARENT: &str = "Task cancelled with its parent run";

const NOTIFICATION_CAPACITY: usize = 64;

/// Lifecycle notification of a background task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskNotification {
    Started {
        task_id: TaskId,
        description: String,
    },
    Progress {
        task_id: TaskId,
        message: String,
    },
    Completed {
        task_id: TaskId,
        answer: String,
    },
    Failed {
        task_id: TaskId,
        error: String,
    },
}

impl TaskNotification {
    pub fn task_id(&self) -> &TaskId {
        match self {
            TaskNotification::Started { task_id, .. }
            | TaskNotification::Progress { task_id, .. }
            | TaskNotification::Completed { task_id, .. }
            | TaskNotification::Failed { task_id, .. } => task_id,
        }
    }
}

struct TaskEntry {
    record: BackgroundTaskRecord,
    cancel: CancellationToken,
}

/// Owns background task records and their cancellation tokens.
pub struct TaskManager {
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
    notifications: broadcast::Sender<TaskNotification>,
}

impl Default for TaskManager {
    fn default() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            tasks: Mutex::new(HashMap::new()),
            notifications,
        }
    }
}

impl TaskManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Receive lifecycle notifications for every task started from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskNotification> {
        self.notifications.subscribe()
    }

    pub async fn get(&self, id: &TaskId) -> Option<BackgroundTaskRecord> {
        self.tasks.lock().await.get(id).map(|e| e.record.clone())
    }

    /// All records, oldest first
    pub async fn list(&self) -> Vec<BackgroundTaskRecord> {
        let mut records: Vec<_> = self
            .tasks
            .lock()
            .await
            .values()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        records
    }

    /// Drop a finished record. Running tasks are left in place.
    pub async fn remove(&self, id: &TaskId) -> Option<BackgroundTaskRecord> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.get(id)?.record.status.is_terminal() {
            return None;
        }
        tasks.remove(id).map(|e| e.record)
    }

    /// Drop every finished record and return how many were removed.
    pub async fn prune_finished(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        let before = tasks.len();
        tasks.retain(|_, e| !e.record.status.is_terminal());
        let removed = before - tasks.len();
        if removed > 0 {
            debug!(removed, remaining = tasks.len(), "Pruned finished tasks");
        }
        removed
    }

    /// Record a running task and drive `runtime` on a detached task.
    ///
    /// Returns as soon as the record exists; the child run has not
    /// necessarily produced anything yet.
    pub async fn spawn(
        self: &Arc<Self>,
        description: impl Into<String>,
        agent: Option<String>,
        runtime: SessionRuntime,
        prompt: impl Into<String>,
        cancel: CancellationToken,
    ) -> TaskId {
        let id = TaskId::new(format!("task_{}", &Uuid::new_v4().simple().to_string()[..8]));
        let description = description.into();
        let record = BackgroundTaskRecord::running(id.clone(), description.clone(), agent);

        self.tasks.lock().await.insert(
            id.clone(),
            TaskEntry {
                record,
                cancel: cancel.clone(),
            },
        );
        let _ = self.notifications.send(TaskNotification::Started {
            task_id: id.clone(),
            description: description.clone(),
        });
        info!(task_id = %id, description = %description, "Background task started");

        let manager = Arc::clone(self);
        let task_id = id.clone();
        let prompt = prompt.into();
        tokio::spawn(async move {
            let mut handle = runtime.start_run(prompt, cancel);
            while let Some(event) = handle.next_event().await {
                if let RunEvent::ToolStart { tool, .. } = event {
                    let _ = manager.notifications.send(TaskNotification::Progress {
                        task_id: task_id.clone(),
                        message: format!("Running tool: {}", tool),
                    });
                }
            }
            let outcome = handle.result().await;
            manager.finish(&task_id, outcome).await;
        });

        id
    }

    /// Cancel a running task.
    ///
    /// Returns the record afterwards, or `None` for an unknown id. Terminal
    /// records are returned unchanged.
    pub async fn cancel(&self, id: &TaskId) -> Option<BackgroundTaskRecord> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks.get_mut(id)?;
        if entry.record.status == TaskStatus::Running {
            entry.cancel.cancel();
            if entry.record.fail(CANCELLED_BY_USER).is_ok() {
                info!(task_id = %id, "Background task cancelled");
                let _ = self.notifications.send(TaskNotification::Failed {
                    task_id: id.clone(),
                    error: CANCELLED_BY_USER.to_string(),
                });
            }
        } else {
            debug!(task_id = %id, status = %entry.record.status.as_str(), "Cancel ignored for finished task");
        }
        Some(entry.record.clone())
    }

    async fn finish(&self, id: &TaskId, outcome: Result<RunResult, RunError>) {
        let mut tasks = self.tasks.lock().await;
        let Some(entry) = tasks.get_mut(id) else {
            return;
        };
        if entry.record.status.is_terminal() {
            debug!(task_id = %id, "Task already finished, dropping late outcome");
            return;
        }

        let notification = match outcome {
            Ok(result) => match entry.record.complete(&result) {
                Ok(()) => {
                    info!(
                        task_id = %id,
                        iterations = result.iterations,
                        duration_ms = result.duration_ms,
                        "Background task completed"
                    );
                    TaskNotification::Completed {
                        task_id: id.clone(),
                        answer: result.answer,
                    }
                }
                Err(e) => {
                    warn!(task_id = %id, error = %e, "Task transition rejected");
                    return;
                }
            },
            Err(e) => {
                let error = match &e {
                    RunError::Cancelled => CANCELLED_WITH_PARENT.to_string(),
                    other => other.to_string(),
                };
                if let Err(e) = entry.record.fail(error.clone()) {
                    warn!(task_id = %id, error = %e, "Task transition rejected");
                    return;
                }
                warn!(task_id = %id, error = %error, "Background task failed");
                TaskNotification::Failed {
                    task_id: id.clone(),
                    error,
                }
            }
        };
        let _ = self.notifications.send(notification);
    }
}
