//! Tool domain module
//!
//! Defines the core abstractions for the agent's **Tool System**: what a
//! capability looks like to the registry, to the model, and to the ledger.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────────┐
//! │ ToolDefinition │───▶│ ToolCall     │───▶│ result text      │
//! │ (registry)     │    │ (invocation) │    │ or "Error: ..."  │
//! └────────────────┘    └──────────────┘    └──────────────────┘
//! ```
//!
//! # Risk-Based Permission
//!
//! Each tool carries a [`RiskLevel`](entities::RiskLevel) that permission
//! gateways fall back to when no explicit rule matches:
//!
//! | Risk | Examples | Default decision |
//! |------|----------|------------------|
//! | **Safe** | `task_status` | allow |
//! | **Moderate** | `todo_write`, `task`, `task_cancel` | allow |
//! | **Dangerous** | command-backed plugin tools | ask |
//!
//! # Error Results
//!
//! Executors return plain text. Any text starting with
//! [`ERROR_PREFIX`](value_objects::ERROR_PREFIX) is treated as a failure for
//! ledger and event purposes, without raising.
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions and validation, no I/O
//! - **Application**: the `ToolRegistry` and `ToolHandler` port
//! - **Infrastructure**: plugin discovery and concrete handlers

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{RiskLevel, ToolCall, ToolDefinition, ToolParameter, ToolSchema};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ERROR_PREFIX, ToolError, is_error_output};
