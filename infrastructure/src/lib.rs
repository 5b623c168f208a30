//! Infrastructure layer for kestrel
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration loading, plugin discovery,
//! permission and hook gateways, the replay LLM gateway and run-event
//! logging.

pub mod config;
pub mod gateways;
pub mod logging;
pub mod providers;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigError, ConfigIssue, ConfigLoader, ConfigSource, FileConfig, Severity};
pub use gateways::{CommandHookGateway, RulePermissionGateway};
pub use logging::JsonlEventLogger;
pub use providers::{ReplayError, ScriptedLlmGateway};
pub use tools::{CommandTool, DirectoryToolScanner, TodoWriteTool, ToolManifest};
