//! Tool registry and model-facing toolsets.
//!
//! - [`registry::ToolRegistry`] - catalog of tool specifications, validated on demand
//! - [`toolset::BoundToolset`] - a registry bound to one run's execution context
//! - [`schema::JsonSchemaToolConverter`] - provider-neutral JSON Schema for the model

pub mod registry;
pub mod schema;
pub mod toolset;

pub use registry::{MAX_TOOLS, RegistryError, ToolRegistry, ToolSpec};
pub use schema::JsonSchemaToolConverter;
pub use toolset::{BoundToolset, ToolOutcome};
