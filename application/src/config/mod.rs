//! Application configuration
//!
//! [`RuntimeConfig`] holds the loop-control parameters of a session
//! runtime. It is built by the infrastructure layer from the file config,
//! and derived again for every delegated child run.

pub mod runtime_config;

pub use runtime_config::RuntimeConfig;
