//! Domain layer for kestrel
//!
//! This crate contains the core entities and value objects of the agent
//! runtime. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Tool**: a named, schema-validated, risk-classified capability the
//!   model may invoke ([`tool`])
//! - **Run**: one execution of the session runtime, observed as a stream of
//!   [`RunEvent`]s that ends in a [`RunResult`] ([`agent`])
//! - **Background task**: a detached delegation tracked by a
//!   [`BackgroundTaskRecord`] ([`agent`])
//! - **Compaction**: shrinking the history to stay under a token budget
//!   ([`context`])

pub mod agent;
pub mod context;
pub mod core;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    AgentProfile, BackgroundTaskRecord, RunEvent, RunResult, TaskId, TaskStatus, ToolCallRecord,
};
pub use context::{CompactionPolicy, CompactionWindow, estimate_tokens};
pub use core::{error::DomainError, model::Model};
pub use session::{
    entities::{Message, Role},
    response::{ContentBlock, LlmResponse, StopReason, TokenUsage},
    stream::StreamEvent,
};
pub use tool::{
    DefaultToolValidator, ERROR_PREFIX, RiskLevel, ToolCall, ToolDefinition, ToolError,
    ToolParameter, ToolSchema, ToolValidator, is_error_output,
};
