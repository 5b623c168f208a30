//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod event_logger;
pub mod hook_gateway;
pub mod llm_gateway;
pub mod permission_gateway;
pub mod tool_discovery;
pub mod tool_handler;
