//! Tool discovery port
//!
//! A scanner turns one plugin directory into zero or more tool
//! specifications. The registry drives it over every configured location.

use crate::tools::registry::ToolSpec;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot read plugin directory {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Invalid tool manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },
}

/// Port for scanning a directory for tool plugins.
#[async_trait]
pub trait ToolScanner: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn scan(&self, dir: &Path) -> Result<Vec<ToolSpec>, DiscoveryError>;
}
