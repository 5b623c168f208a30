//! LLM gateway adapters.

mod scripted;

pub use scripted::{ReplayError, ScriptedLlmGateway};
