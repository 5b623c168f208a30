//! Application layer for kestrel
//!
//! This crate contains the session runtime, the tool registry, task
//! delegation, context compaction and the ports their adapters implement.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod tools;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::RuntimeConfig;
pub use ports::{
    event_logger::{EventLogger, EventSink, NoEventLogger},
    hook_gateway::{HookEvent, HookGateway, HookOutcome, NoHooks},
    llm_gateway::{ChatRequest, GatewayError, LlmGateway, StreamHandle},
    permission_gateway::{AllowAllPermissions, PermissionDecision, PermissionGateway},
    tool_discovery::{DiscoveryError, ToolScanner},
    tool_handler::{ExecutionContext, ProgressSink, ToolContext, ToolHandler},
};
pub use tools::{BoundToolset, MAX_TOOLS, RegistryError, ToolOutcome, ToolRegistry, ToolSpec};
pub use use_cases::compact_context::{CompactionReport, ContextCompactor};
pub use use_cases::delegate_task::{
    DelegationError, DelegationOutcome, DelegationRequest, MAX_DELEGATION_DEPTH, RuntimeFactory,
    SessionRuntimeFactory, TODO_TOOL, TaskDelegator, TaskManager, TaskNotification,
};
pub use use_cases::run_session::{RunError, RunHandle, SessionRuntime};
