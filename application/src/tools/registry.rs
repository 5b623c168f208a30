//! Tool Registry
//!
//! The [`ToolRegistry`] maps tool names to [`ToolSpec`]s (definition plus
//! handler).
//!
//! # Registration vs. Validation
//!
//! Registration never fails: a second registration under the same name
//! overwrites the first (last write wins) and is remembered. Invariants are
//! enforced in one place, [`ToolRegistry::validate`], which callers invoke
//! after registration and before binding:
//!
//! - every tool has a schema and a risk level
//! - no name was registered twice
//! - at most [`MAX_TOOLS`] tools
//!
//! # Discovery
//!
//! [`ToolRegistry::discover`] runs a [`ToolScanner`] over plugin directories.
//! Tools already registered (built-ins) win over discovered ones with the
//! same name, the first discovered tool wins among plugins, and a failing
//! directory is logged and skipped.

use crate::ports::tool_discovery::ToolScanner;
use crate::ports::tool_handler::ToolHandler;
use kestrel_domain::ToolDefinition;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on registry size. Offering a model more tools than this
/// degrades its tool selection.
pub const MAX_TOOLS: usize = 50;

/// Registry invariant violations reported by [`ToolRegistry::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool registry holds {count} tools; at most {max} are allowed")]
    TooManyTools { count: usize, max: usize },

    #[error("Tool with an empty name registered")]
    EmptyName,

    #[error("Tool '{0}' has no input schema")]
    MissingSchema(String),

    #[error("Tool '{0}' has no risk level")]
    MissingRiskLevel(String),

    #[error("Tool '{0}' registered more than once")]
    DuplicateTool(String),
}

/// A tool: its definition plus the handler that executes it
#[derive(Clone)]
pub struct ToolSpec {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    pub fn new(definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            definition,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Catalog of tools available to a run
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
    /// Names that were registered more than once
    duplicates: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Overwrites an existing tool of the same name.
    pub fn register(&mut self, spec: ToolSpec) {
        let name = spec.name().to_string();
        if self.tools.insert(name.clone(), spec).is_some() {
            tracing::debug!(tool = %name, "Tool re-registered, previous definition replaced");
            self.duplicates.push(name);
        }
    }

    pub fn register_all(&mut self, specs: impl IntoIterator<Item = ToolSpec>) {
        for spec in specs {
            self.register(spec);
        }
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, spec: ToolSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// All tools, sorted by name
    pub fn get_all(&self) -> Vec<&ToolSpec> {
        self.tools.values().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check every registry invariant, reporting the first violation.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.tools.len() > MAX_TOOLS {
            return Err(RegistryError::TooManyTools {
                count: self.tools.len(),
                max: MAX_TOOLS,
            });
        }

        for (name, spec) in &self.tools {
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if spec.definition.schema.is_none() {
                return Err(RegistryError::MissingSchema(name.clone()));
            }
            if spec.definition.risk_level.is_none() {
                return Err(RegistryError::MissingRiskLevel(name.clone()));
            }
        }

        if let Some(name) = self.duplicates.first() {
            return Err(RegistryError::DuplicateTool(name.clone()));
        }

        Ok(())
    }

    /// A new registry holding the tools that satisfy `keep`.
    pub fn filtered(&self, mut keep: impl FnMut(&ToolSpec) -> bool) -> ToolRegistry {
        ToolRegistry {
            tools: self
                .tools
                .iter()
                .filter(|(_, spec)| keep(spec))
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect(),
            duplicates: Vec::new(),
        }
    }

    /// Scan plugin directories and return tools not already registered.
    ///
    /// The returned specs are not registered; pass them to
    /// [`register_all`](Self::register_all).
    pub async fn discover(&self, dirs: &[PathBuf], scanner: &dyn ToolScanner) -> Vec<ToolSpec> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut discovered = Vec::new();

        for dir in dirs {
            if !dir.exists() {
                tracing::debug!(dir = %dir.display(), "Plugin directory does not exist, skipping");
                continue;
            }

            match scanner.scan(dir).await {
                Ok(specs) => {
                    for spec in specs {
                        let name = spec.name().to_string();
                        if self.contains(&name) {
                            tracing::debug!(
                                tool = %name,
                                dir = %dir.display(),
                                "Built-in tool takes precedence over plugin"
                            );
                            continue;
                        }
                        if !seen.insert(name.clone()) {
                            tracing::trace!(
                                tool = %name,
                                dir = %dir.display(),
                                "Tool already discovered in an earlier directory"
                            );
                            continue;
                        }
                        tracing::debug!(tool = %name, scanner = scanner.name(), "Discovered tool");
                        discovered.push(spec);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        scanner = scanner.name(),
                        dir = %dir.display(),
                        error = %e,
                        "Failed to discover tools in directory"
                    );
                }
            }
        }

        discovered
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("duplicates", &self.duplicates)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_discovery::DiscoveryError;
    use crate::testing::echo_spec;
    use async_trait::async_trait;
    use kestrel_domain::RiskLevel;
    use std::collections::HashMap;
    use std::path::Path;

    fn registry_of(count: usize) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_all((0..count).map(|i| echo_spec(&format!("tool_{i:02}"))));
        registry
    }

    #[test]
    fn test_fifty_tools_validate() {
        let registry = registry_of(50);
        assert_eq!(registry.len(), 50);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_fifty_first_tool_fails_naming_limit() {
        let registry = registry_of(51);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("50"));
        assert_eq!(err, RegistryError::TooManyTools { count: 51, max: 50 });
    }

    #[test]
    fn test_missing_schema_names_tool() {
        let mut spec = echo_spec("no_schema");
        spec.definition.schema = None;
        let registry = registry_of(2).with(spec);
        let err = registry.validate().unwrap_err();
        assert_eq!(err, RegistryError::MissingSchema("no_schema".into()));
        assert!(err.to_string().contains("no_schema"));
    }

    #[test]
    fn test_missing_risk_names_tool() {
        let mut spec = echo_spec("no_risk");
        spec.definition.risk_level = None;
        let err = ToolRegistry::new().with(spec).validate().unwrap_err();
        assert!(err.to_string().contains("no_risk"));
    }

    #[test]
    fn test_duplicate_overwrites_but_fails_validation() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("dup"));
        let mut second = echo_spec("dup");
        second.definition.description = "second".into();
        registry.register(second);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().definition.description, "second");
        assert_eq!(
            registry.validate().unwrap_err(),
            RegistryError::DuplicateTool("dup".into())
        );
    }

    #[test]
    fn test_get_all_sorted_and_filtered() {
        let registry = ToolRegistry::new()
            .with(echo_spec("b"))
            .with(echo_spec("a"))
            .with(echo_spec("c"));
        let names: Vec<&str> = registry.get_all().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let child = registry.filtered(|s| s.name() != "b");
        assert_eq!(child.names().collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(registry.contains("b"));
    }

    struct MapScanner {
        by_dir: HashMap<PathBuf, Result<Vec<&'static str>, ()>>,
    }

    #[async_trait]
    impl ToolScanner for MapScanner {
        fn name(&self) -> &str {
            "map"
        }

        async fn scan(&self, dir: &Path) -> Result<Vec<ToolSpec>, DiscoveryError> {
            match self.by_dir.get(dir) {
                Some(Ok(names)) => Ok(names
                    .iter()
                    .map(|n| {
                        let mut spec = echo_spec(n);
                        spec.definition.risk_level = Some(RiskLevel::Dangerous);
                        spec
                    })
                    .collect()),
                _ => Err(DiscoveryError::Unreadable {
                    path: dir.to_path_buf(),
                    reason: "boom".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_discover_dedupes_and_prefers_builtins() {
        let root = std::env::temp_dir();
        let first = root.clone();
        let second = root.join("..");
        let scanner = MapScanner {
            by_dir: HashMap::from([
                (first.clone(), Ok(vec!["echo", "lint", "fmt"])),
                (second.clone(), Ok(vec!["lint", "deploy"])),
            ]),
        };
        let registry = ToolRegistry::new().with(echo_spec("echo"));

        let found = registry.discover(&[first, second], &scanner).await;
        let names: Vec<&str> = found.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["lint", "fmt", "deploy"]);
        assert!(found.iter().all(|s| s.definition.risk_level == Some(RiskLevel::Dangerous)));
    }

    #[tokio::test]
    async fn test_discover_survives_failing_directory() {
        let good = std::env::temp_dir();
        let bad = std::env::current_dir().unwrap();
        let scanner = MapScanner {
            by_dir: HashMap::from([(bad.clone(), Err(())), (good.clone(), Ok(vec!["lint"]))]),
        };
        let found = ToolRegistry::new().discover(&[bad, good], &scanner).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "lint");
    }
}
