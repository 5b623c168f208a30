//! Runtime parameters - run loop control.

use kestrel_domain::Model;
use serde::{Deserialize, Serialize};

/// Loop-control parameters of one session runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Model used for every turn of the run
    pub model: Model,
    /// System prompt seeded as the first message
    pub system_prompt: String,
    /// Maximum model round-trips before the run ends anyway
    pub max_iterations: u32,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
    pub const DEFAULT_SYSTEM_PROMPT: &'static str = "You are a capable autonomous agent. Use the available tools when they help, \
         delegate self-contained sub-tasks with the `task` tool, and answer concisely once done.";

    // ==================== Builder Methods ====================

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: Model::default(),
            system_prompt: Self::DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}
