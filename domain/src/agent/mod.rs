//! Agent domain module
//!
//! Types that describe what a run produces and what delegation tracks:
//!
//! - [`run_event::RunEvent`] - ordered events emitted during a run, ending in `Done`
//! - [`run_result::RunResult`] - the terminal state of a run, with its tool-call ledger
//! - [`profile::AgentProfile`] - a named persona a run can delegate to
//! - [`background_task::BackgroundTaskRecord`] - lifecycle of a detached delegation
//!
//! # Background Task Transitions
//!
//! ```text
//! Running ──> Completed
//!        └──> Failed      (child error or cancellation)
//! ```
//!
//! A record leaves `Running` exactly once; later transitions are rejected.

pub mod background_task;
pub mod profile;
pub mod run_event;
pub mod run_result;

pub use background_task::{BackgroundTaskRecord, TaskId, TaskStatus};
pub use profile::AgentProfile;
pub use run_event::RunEvent;
pub use run_result::{RunResult, ToolCallRecord};
