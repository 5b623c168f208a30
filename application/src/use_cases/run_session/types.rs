//! Type definitions for the RunSession use case.

use futures::Stream;
use kestrel_domain::{RunEvent, RunResult};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that end a run early
#[derive(Error, Debug)]
pub enum RunError {
    /// The run's cancellation token fired; no `done` event was emitted.
    #[error("Operation cancelled")]
    Cancelled,

    /// The model transport failed. `error` and `done` events were emitted
    /// and `partial` carries what the run had produced so far.
    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        partial: Box<RunResult>,
    },

    #[error("Run task failed: {0}")]
    Join(String),
}

impl RunError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled)
    }
}

/// A run executing on its own task.
///
/// Events arrive in order through the handle (it is a [`Stream`]); the final
/// outcome is available from [`result`](Self::result).
pub struct RunHandle {
    events: mpsc::Receiver<RunEvent>,
    join: JoinHandle<Result<RunResult, RunError>>,
}

impl RunHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<RunEvent>,
        join: JoinHandle<Result<RunResult, RunError>>,
    ) -> Self {
        Self { events, join }
    }

    /// Receive the next event, or `None` once the run has finished.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Wait for the run to finish, discarding any events not yet received.
    pub async fn result(mut self) -> Result<RunResult, RunError> {
        while self.events.recv().await.is_some() {}
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(RunError::Join(e.to_string())),
        }
    }
}

impl Stream for RunHandle {
    type Item = RunEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}
