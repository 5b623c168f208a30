//! Directory plugin scanner.
//!
//! Looks for `*.tool.toml` manifests directly inside a plugin directory.
//! A broken manifest is logged and skipped so one bad file never hides the
//! rest of the directory.

use super::command::CommandTool;
use super::manifest::ToolManifest;
use async_trait::async_trait;
use kestrel_application::{DiscoveryError, ToolScanner, ToolSpec};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MANIFEST_SUFFIX: &str = ".tool.toml";

/// Scans a directory for TOML tool manifests.
#[derive(Debug, Clone, Default)]
pub struct DirectoryToolScanner {
    working_dir: Option<PathBuf>,
}

impl DirectoryToolScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working directory for the discovered command tools.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn manifest_paths(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let pattern = dir.join(format!("*{}", MANIFEST_SUFFIX));
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern).map_err(|e| DiscoveryError::Unreadable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable plugin entry: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn load(&self, path: &Path) -> Result<ToolSpec, DiscoveryError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DiscoveryError::InvalidManifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let manifest =
            ToolManifest::parse(&text).map_err(|reason| DiscoveryError::InvalidManifest {
                path: path.to_path_buf(),
                reason,
            })?;

        let mut tool = CommandTool::from_manifest(&manifest);
        if let Some(dir) = &self.working_dir {
            tool = tool.with_working_dir(dir);
        }
        Ok(ToolSpec::new(
            manifest.to_definition(),
            std::sync::Arc::new(tool),
        ))
    }
}

#[async_trait]
impl ToolScanner for DirectoryToolScanner {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn scan(&self, dir: &Path) -> Result<Vec<ToolSpec>, DiscoveryError> {
        if !dir.is_dir() {
            debug!("Plugin directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let mut specs = Vec::new();
        for path in Self::manifest_paths(dir)? {
            match self.load(&path).await {
                Ok(spec) => {
                    debug!(tool = %spec.name(), path = %path.display(), "Discovered plugin tool");
                    specs.push(spec);
                }
                Err(e) => warn!("{}", e),
            }
        }
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT_LOG: &str = r#"
name = "git_log"
description = "Show recent commits"
risk = "safe"
command = "git log --oneline -n {count}"

[[parameters]]
name = "count"
type = "integer"
required = true
"#;

    #[tokio::test]
    async fn test_scan_loads_manifests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("git_log.tool.toml"), GIT_LOG).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = DirectoryToolScanner::new().scan(dir.path()).await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name(), "git_log");
        assert_eq!(
            specs[0].definition.risk_level,
            Some(kestrel_domain::RiskLevel::Safe)
        );
        assert_eq!(specs[0].definition.parameters().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_skips_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tool.toml"), GIT_LOG).unwrap();
        std::fs::write(dir.path().join("b.tool.toml"), "name = [broken").unwrap();
        std::fs::write(
            dir.path().join("c.tool.toml"),
            "name = \"\"\ndescription = \"x\"\ncommand = \"true\"\n",
        )
        .unwrap();

        let specs = DirectoryToolScanner::new().scan(dir.path()).await.unwrap();
        assert_eq!(specs.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let specs = DirectoryToolScanner::new()
            .scan(&dir.path().join("absent"))
            .await
            .unwrap();
        assert!(specs.is_empty());
    }
}
