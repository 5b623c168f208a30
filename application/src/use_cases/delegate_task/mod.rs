//! DelegateTask use case
//!
//! Runs a prompt in a nested [`SessionRuntime`], either inline (the caller
//! waits for the child's answer) or in the background (the caller gets a
//! task id and polls or subscribes).
//!
//! The delegation depth travels in the per-call [`ToolContext`]. A child is
//! built with `depth + 1`; the parent's context is never mutated, so the
//! counter is restored on every exit path without extra bookkeeping.

mod task_manager;
mod tools;

pub use task_manager::{CANCELLED_BY_USER, CANCELLED_WITH_PARENT, TaskManager, TaskNotification};
pub use tools::{TASK_CANCEL_TOOL, TASK_STATUS_TOOL, TASK_TOOL, TaskCancelTool, TaskStatusTool, TaskTool};

use crate::config::RuntimeConfig;
use crate::ports::event_logger::{EventLogger, NoEventLogger};
use crate::ports::hook_gateway::{HookGateway, NoHooks};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::permission_gateway::{AllowAllPermissions, PermissionGateway};
use crate::ports::tool_handler::ToolContext;
use crate::tools::{ToolRegistry, ToolSpec};
use crate::use_cases::compact_context::ContextCompactor;
use crate::use_cases::run_session::{RunError, SessionRuntime};
use kestrel_domain::{AgentProfile, RunEvent, RunResult, TaskId, ToolError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Deepest allowed nesting of delegated runs
pub const MAX_DELEGATION_DEPTH: u32 = 3;

/// Iteration ceiling of every delegated run
pub const CHILD_MAX_ITERATIONS: u32 = 5;

/// Name of the todo capability, never offered to child runs
pub const TODO_TOOL: &str = "todo_write";

/// Errors that can occur while delegating
#[derive(Error, Debug)]
pub enum DelegationError {
    #[error("Unknown agent profile: {0}")]
    UnknownAgent(String),

    #[error("Max delegation depth ({max}) reached at depth {depth}")]
    DepthExceeded { depth: u32, max: u32 },

    #[error("Delegation is not configured: no runtime factory")]
    NotConfigured,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Delegated run failed: {0}")]
    Failed(String),
}

impl DelegationError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DelegationError::Cancelled)
    }

    pub fn to_tool_error(&self) -> ToolError {
        match self {
            DelegationError::UnknownAgent(_) => ToolError::not_found(self.to_string()),
            DelegationError::DepthExceeded { .. } | DelegationError::NotConfigured => {
                ToolError::new("DELEGATION_REFUSED", self.to_string())
            }
            DelegationError::Cancelled => ToolError::cancelled(),
            DelegationError::Failed(_) => ToolError::execution_failed(self.to_string()),
        }
    }
}

impl From<RunError> for DelegationError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::Cancelled => DelegationError::Cancelled,
            other => DelegationError::Failed(other.to_string()),
        }
    }
}

/// Builds the runtime a delegated prompt runs in.
pub trait RuntimeFactory: Send + Sync {
    fn create(&self, registry: Arc<ToolRegistry>, config: RuntimeConfig, depth: u32)
    -> SessionRuntime;
}

/// [`RuntimeFactory`] sharing the parent's gateways.
pub struct SessionRuntimeFactory {
    gateway: Arc<dyn LlmGateway>,
    permissions: Arc<dyn PermissionGateway>,
    hooks: Arc<dyn HookGateway>,
    compactor: Option<Arc<ContextCompactor>>,
    event_logger: Arc<dyn EventLogger>,
}

impl SessionRuntimeFactory {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            permissions: Arc::new(AllowAllPermissions),
            hooks: Arc::new(NoHooks),
            compactor: None,
            event_logger: Arc::new(NoEventLogger),
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionGateway>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookGateway>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_compactor(mut self, compactor: Arc<ContextCompactor>) -> Self {
        self.compactor = Some(compactor);
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.event_logger = logger;
        self
    }
}

impl RuntimeFactory for SessionRuntimeFactory {
    fn create(
        &self,
        registry: Arc<ToolRegistry>,
        config: RuntimeConfig,
        depth: u32,
    ) -> SessionRuntime {
        let mut runtime = SessionRuntime::new(self.gateway.clone(), registry, config)
            .with_permissions(self.permissions.clone())
            .with_hooks(self.hooks.clone())
            .with_event_logger(self.event_logger.clone())
            .with_delegation_depth(depth);
        if let Some(compactor) = &self.compactor {
            runtime = runtime.with_compactor(compactor.clone());
        }
        runtime
    }
}

/// One delegation attempt
#[derive(Debug, Clone)]
pub struct DelegationRequest {
    pub description: String,
    pub prompt: String,
    /// Profile name; `None` runs with the parent's prompt and model
    pub agent: Option<String>,
    pub background: bool,
}

impl DelegationRequest {
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
            agent: None,
            background: false,
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }
}

/// What a delegation produced
#[derive(Debug, Clone)]
pub enum DelegationOutcome {
    Completed(RunResult),
    Spawned(TaskId),
}

/// Resolves profiles, enforces the depth limit and runs children.
pub struct TaskDelegator {
    factory: Option<Arc<dyn RuntimeFactory>>,
    profiles: HashMap<String, AgentProfile>,
    tasks: Arc<TaskManager>,
}

impl TaskDelegator {
    pub fn new(tasks: Arc<TaskManager>) -> Self {
        Self {
            factory: None,
            profiles: HashMap::new(),
            tasks,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn RuntimeFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = AgentProfile>) -> Self {
        self.profiles
            .extend(profiles.into_iter().map(|p| (p.name.clone(), p)));
        self
    }

    pub fn tasks(&self) -> &Arc<TaskManager> {
        &self.tasks
    }

    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn delegate(
        &self,
        request: DelegationRequest,
        ctx: &ToolContext,
    ) -> Result<DelegationOutcome, DelegationError> {
        let profile = match &request.agent {
            Some(name) => Some(
                self.profiles
                    .get(name)
                    .ok_or_else(|| DelegationError::UnknownAgent(name.clone()))?,
            ),
            None => None,
        };

        let depth = ctx.delegation_depth();
        if depth >= MAX_DELEGATION_DEPTH {
            info!(depth, "Delegation refused at depth limit");
            return Err(DelegationError::DepthExceeded {
                depth,
                max: MAX_DELEGATION_DEPTH,
            });
        }

        let factory = self.factory.as_ref().ok_or(DelegationError::NotConfigured)?;

        let child_depth = depth + 1;
        let registry = child_registry(&ctx.registry, profile, child_depth);
        let config = RuntimeConfig {
            model: profile
                .and_then(|p| p.model.clone())
                .unwrap_or_else(|| ctx.execution.model.clone()),
            system_prompt: profile
                .and_then(|p| p.system_prompt.clone())
                .unwrap_or_else(|| ctx.execution.system_prompt.clone()),
            max_iterations: CHILD_MAX_ITERATIONS,
        };
        debug!(
            depth = child_depth,
            tools = registry.len(),
            model = %config.model,
            agent = request.agent.as_deref().unwrap_or("default"),
            "Building delegated runtime"
        );
        let child = factory.create(Arc::new(registry), config, child_depth);
        let cancel = ctx.cancel().child_token();

        if request.background {
            let id = self
                .tasks
                .spawn(request.description, request.agent, child, request.prompt, cancel)
                .await;
            return Ok(DelegationOutcome::Spawned(id));
        }

        info!(depth = child_depth, description = %request.description, "Delegated run started");
        let label = request.agent.as_deref().unwrap_or("task");
        let mut handle = child.start_run(request.prompt, cancel);
        while let Some(event) = handle.next_event().await {
            if let RunEvent::ToolStart { tool, .. } = event {
                ctx.progress.report(format!("[{}] {}", label, tool)).await;
            }
        }
        let result = handle.result().await?;
        info!(
            depth = child_depth,
            iterations = result.iterations,
            duration_ms = result.duration_ms,
            "Delegated run finished"
        );
        Ok(DelegationOutcome::Completed(result))
    }
}

/// The parent's tools minus todo management, minus `task` at the depth
/// limit, narrowed to the profile's allowlist.
fn child_registry(
    parent: &ToolRegistry,
    profile: Option<&AgentProfile>,
    child_depth: u32,
) -> ToolRegistry {
    let nesting_allowed = child_depth < MAX_DELEGATION_DEPTH;
    parent.filtered(|spec: &ToolSpec| {
        let name = spec.name();
        if name == TODO_TOOL {
            return false;
        }
        if name == TASK_TOOL && !nesting_allowed {
            return false;
        }
        profile.is_none_or(|p| p.allows(name))
    })
}
