//! LLM Session domain.
//!
//! - [`entities::Message`] - a single turn in the conversation history
//! - [`response::LlmResponse`] - a structured model turn (text + tool use)
//! - [`stream::StreamEvent`] - incremental model output

pub mod entities;
pub mod response;
pub mod stream;
