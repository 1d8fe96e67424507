//! Project: the root aggregate of a build.
//!
//! A project is read from a `project.json`, owns every module discovered from
//! its declarations, and answers the cross-module questions: dependency
//! order, group expansion, and which asset bundles a module feeds.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::{
    find_project_from, load_project_config, AssetConfig, ConfigError, ProjectConfig,
    PROJECT_CONFIG_FILENAME,
};
use crate::graph::{DependencyError, DependencyGraph};
use crate::lang::DIALECT;
use crate::module::{normalize_path, Module};
use crate::tree::{discover, ModuleTree};

/// Error type for project operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProjectError {
    /// No `project.json` above the starting directory
    #[error("No project.json found in '{}' or any parent directory", .0.display())]
    NotFound(PathBuf),
    /// The project descriptor could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A project and all of its modules.
#[derive(Debug, Clone)]
pub struct Project {
    id: String,
    root: PathBuf,
    config: ProjectConfig,
    modules: ModuleTree,
}

impl Project {
    /// Assemble a project from its parts.
    pub fn new(root: impl AsRef<Path>, config: ProjectConfig, modules: ModuleTree) -> Self {
        let root = normalize_path(root.as_ref());
        let id = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { id, root, config, modules }
    }

    /// Read `project.json` in `root` and discover its module tree.
    pub fn read(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref();
        let config = load_project_config(&root.join(PROJECT_CONFIG_FILENAME))?;
        let modules = discover(root, &config.modules);
        info!("Loaded project '{}' with {} modules", config.name, modules.len());
        Ok(Self::new(root, config, modules))
    }

    /// Find the nearest `project.json` at or above `start` and read it.
    pub fn find(start: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let start = start.as_ref();
        let config_path = find_project_from(start.to_path_buf())
            .ok_or_else(|| ProjectError::NotFound(start.to_path_buf()))?;
        let root = config_path.parent().unwrap_or(start);
        Self::read(root)
    }

    /// Project id: the name of its root directory.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Description.
    pub fn description(&self) -> &str {
        &self.config.description
    }

    /// Project kind.
    pub fn kind(&self) -> &str {
        &self.config.kind
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration this project was read from.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Declared target languages, in order.
    pub fn languages(&self) -> &[String] {
        &self.config.languages
    }

    /// Declared languages a dialect source is translated into.
    pub fn target_languages(&self) -> impl Iterator<Item = &str> {
        self.config.languages.iter().map(String::as_str).filter(|l| *l != DIALECT)
    }

    /// Declared asset bundles.
    pub fn assets(&self) -> &[AssetConfig] {
        &self.config.assets
    }

    /// All modules in discovery order.
    pub fn modules(&self) -> &ModuleTree {
        &self.modules
    }

    /// Look up a module by name.
    pub fn get_module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Module owning an absolute file path.
    pub fn find_module_by_file(&self, file: &Path) -> Option<&Module> {
        self.modules.find_by_file(file)
    }

    /// Dependency graph over all modules.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_modules(self.modules.iter())
    }

    /// Order module names so that required modules come first.
    ///
    /// Only names in `names` are emitted; see [`DependencyGraph::sort`].
    pub fn sort_required_modules<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<String>, DependencyError> {
        self.dependency_graph().sort(names)
    }

    /// Expand `@group` references into module names and drop duplicates.
    ///
    /// Groups expand in module discovery order; literal names are kept as
    /// written, even when no such module exists.
    pub fn expand_module_list<S: AsRef<str>>(&self, refs: &[S]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for item in refs {
            let item = item.as_ref();
            if item.starts_with('@') {
                for module in self.modules.with_group(item) {
                    push_unique(&mut names, module.name());
                }
            } else {
                push_unique(&mut names, item);
            }
        }
        names
    }

    /// Ordered module list of an asset bundle.
    pub fn resolve_asset_modules(
        &self,
        asset: &AssetConfig,
    ) -> Result<Vec<String>, DependencyError> {
        let names = self.expand_module_list(asset.modules.as_slice());
        self.sort_required_modules(names.as_slice())
    }

    /// Asset bundles that include `module`.
    pub fn project_assets(&self, module: &Module) -> Vec<&AssetConfig> {
        self.config.assets.iter().filter(|a| module.in_module_list(a.modules.as_slice())).collect()
    }

    /// Absolute path of an asset bundle's destination.
    pub fn asset_path(&self, asset: &AssetConfig) -> Option<PathBuf> {
        let dest = asset.dest.trim();
        if dest.is_empty() {
            return None;
        }
        Some(normalize_path(&self.root.join(dest.trim_start_matches('/'))))
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
