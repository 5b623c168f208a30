//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod compact_context;
pub mod delegate_task;
pub mod run_session;
pub(crate) mod shared;
