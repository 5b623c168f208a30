//! Built-in and plugin tools.
//!
//! - [`TodoWriteTool`]: in-memory todo list, never handed to child runs
//! - [`DirectoryToolScanner`]: discovers `*.tool.toml` manifests and turns
//!   each into a [`CommandTool`]

mod command;
mod discovery;
mod manifest;
mod todo;

pub use command::CommandTool;
pub use discovery::{DirectoryToolScanner, MANIFEST_SUFFIX};
pub use manifest::{ManifestParameter, ToolManifest};
pub use todo::{TodoItem, TodoStatus, TodoWriteTool};
