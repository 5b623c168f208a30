//! Port for structured run-event logging.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port records every [`RunEvent`]
//! in a machine-readable transcript (e.g. JSONL).

use kestrel_domain::RunEvent;

/// Port for logging run events.
///
/// `log` is synchronous and non-fallible so a broken log sink never
/// disrupts a run; implementations swallow their own I/O errors.
pub trait EventLogger: Send + Sync {
    fn log(&self, event: &RunEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoEventLogger;

impl EventLogger for NoEventLogger {
    fn log(&self, _event: &RunEvent) {}
}

/// Delivers run events to the run's consumer and to the event logger.
///
/// Sends wait for channel capacity, so a slow consumer applies
/// back-pressure to the run. A dropped consumer is tolerated: the run
/// continues and events are only logged.
#[derive(Clone)]
pub struct EventSink {
    sender: tokio::sync::mpsc::Sender<RunEvent>,
    logger: std::sync::Arc<dyn EventLogger>,
}

impl EventSink {
    pub fn new(
        sender: tokio::sync::mpsc::Sender<RunEvent>,
        logger: std::sync::Arc<dyn EventLogger>,
    ) -> Self {
        Self { sender, logger }
    }

    pub async fn emit(&self, event: RunEvent) {
        self.logger.log(&event);
        if self.sender.send(event).await.is_err() {
            tracing::trace!("Run event receiver dropped");
        }
    }
}
