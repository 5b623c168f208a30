//! Config-driven implementations of the permission and hook ports.

mod hooks;
mod permissions;

pub use hooks::{BLOCK_EXIT_CODE, CommandHookGateway};
pub use permissions::RulePermissionGateway;
