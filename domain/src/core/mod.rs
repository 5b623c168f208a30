//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`] - model identifiers a run or delegated agent may use
//! - [`error::DomainError`] - domain-level errors

pub mod error;
pub mod model;
