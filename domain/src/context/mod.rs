//! Conversation context budgeting.
//!
//! - [`compaction_policy::CompactionPolicy`] - token threshold and retained window
//! - [`compaction_policy::CompactionWindow`] - which messages a compaction drops
//! - [`compaction_policy::estimate_tokens`] - cheap token estimate for a history
//!
//! The policy is pure: it only decides *whether* and *where* to cut. The
//! application layer's context compactor performs the summarization or
//! truncation.

pub mod compaction_policy;

pub use compaction_policy::{CompactionPolicy, CompactionWindow, estimate_tokens};
