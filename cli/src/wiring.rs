//! Dependency wiring: config + adapters -> registry, delegator and runtime.

use anyhow::{Result, bail};
use kestrel_application::{
    ContextCompactor, EventLogger, HookGateway, LlmGateway, NoEventLogger, NoHooks,
    PermissionGateway, SessionRuntime, SessionRuntimeFactory, TaskDelegator, TaskManager,
    ToolRegistry,
};
use kestrel_infrastructure::{
    CommandHookGateway, DirectoryToolScanner, FileConfig, RulePermissionGateway, Severity,
    TodoWriteTool,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Log config issues; fail when any of them is an error.
pub fn check_config(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Error => tracing::error!(field = %issue.field, "{}", issue.message),
            Severity::Warning => warn!(field = %issue.field, "{}", issue.message),
        }
    }
    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("Configuration has {} error(s); run `kestrel config` for details", errors);
    }
    Ok(())
}

pub fn plugin_dirs(config: &FileConfig, extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs = config.tools.resolved_plugin_dirs();
    for dir in extra {
        if !dirs.contains(dir) {
            dirs.push(dir.clone());
        }
    }
    dirs
}

/// Everything a run needs, built once from the configuration.
pub struct Assembly {
    pub runtime: SessionRuntime,
    pub tasks: Arc<TaskManager>,
}

pub struct Wiring<'a> {
    config: &'a FileConfig,
    gateway: Arc<dyn LlmGateway>,
    event_logger: Arc<dyn EventLogger>,
    plugin_dirs: Vec<PathBuf>,
}

impl<'a> Wiring<'a> {
    pub fn new(config: &'a FileConfig, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            config,
            gateway,
            event_logger: Arc::new(NoEventLogger),
            plugin_dirs: config.tools.resolved_plugin_dirs(),
        }
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.event_logger = logger;
        self
    }

    pub fn with_plugin_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.plugin_dirs = dirs;
        self
    }

    fn compactor(&self) -> Arc<ContextCompactor> {
        let (policy, _) = self.config.compaction.to_policy();
        Arc::new(
            ContextCompactor::new(self.gateway.clone(), policy)
                .with_summary_model(self.config.compaction.summary_model()),
        )
    }

    fn hooks(&self) -> Arc<dyn HookGateway> {
        if self.config.hooks.is_empty() {
            Arc::new(NoHooks)
        } else {
            Arc::new(CommandHookGateway::from_config(&self.config.hooks))
        }
    }

    /// Built-in tools, delegation tools and discovered plugins, validated.
    pub async fn registry(&self, delegator: Option<&Arc<TaskDelegator>>) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        if self.config.tools.todo {
            registry.register(TodoWriteTool::new().into_spec());
        }
        if let Some(delegator) = delegator {
            registry.register_all(delegator.tool_specs());
        }

        let discovered = registry
            .discover(&self.plugin_dirs, &DirectoryToolScanner::new())
            .await;
        info!(count = discovered.len(), "Plugin tools discovered");
        registry.register_all(discovered);

        registry.validate()?;
        Ok(registry)
    }

    pub async fn assemble(self) -> Result<Assembly> {
        let permissions: Arc<dyn PermissionGateway> =
            Arc::new(RulePermissionGateway::from_config(&self.config.permissions));
        let hooks = self.hooks();
        let compactor = self.compactor();

        let factory = SessionRuntimeFactory::new(self.gateway.clone())
            .with_permissions(permissions.clone())
            .with_hooks(hooks.clone())
            .with_compactor(compactor.clone());
        let tasks = TaskManager::new();
        let delegator = Arc::new(
            TaskDelegator::new(tasks.clone())
                .with_factory(Arc::new(factory))
                .with_profiles(self.config.agent_profiles()),
        );

        let registry = self.registry(Some(&delegator)).await?;
        let runtime = SessionRuntime::new(
            self.gateway.clone(),
            Arc::new(registry),
            self.config.agent.to_runtime_config(),
        )
        .with_permissions(permissions)
        .with_hooks(hooks)
        .with_compactor(compactor)
        .with_event_logger(self.event_logger.clone());

        Ok(Assembly { runtime, tasks })
    }
}
