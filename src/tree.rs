//! Module tree discovery.
//!
//! Walks nested module declarations starting from the project root. Each
//! declaration is either a single module directory or a folder whose child
//! directories are modules. Resolved modules contribute their own nested
//! declarations, so the walk recurses through the whole tree.
//!
//! Discovery returns a fresh [`ModuleTree`]; nothing is shared between
//! recursive calls.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::NestedModule;
use crate::module::{normalize_path, Module};

/// Ordered set of modules keyed by name.
///
/// Iteration follows discovery order, which is also the order used when a
/// group reference is expanded.
#[derive(Debug, Clone, Default)]
pub struct ModuleTree {
    modules: Vec<Module>,
    index: HashMap<String, usize>,
}

impl ModuleTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from modules in discovery order.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Self {
        let mut tree = Self::new();
        for module in modules {
            tree.insert(module);
        }
        tree
    }

    /// Register a module.
    ///
    /// The first module registered under a name wins; later duplicates are
    /// dropped and `false` is returned.
    pub fn insert(&mut self, module: Module) -> bool {
        if let Some(&existing) = self.index.get(module.name()) {
            warn!(
                "Duplicate module '{}' at {} (already registered from {})",
                module.name(),
                module.path().display(),
                self.modules[existing].path().display()
            );
            return false;
        }
        self.index.insert(module.name().to_string(), self.modules.len());
        self.modules.push(module);
        true
    }

    /// Merge another tree into this one, keeping first-registered names.
    pub fn extend(&mut self, other: ModuleTree) {
        for module in other.modules {
            self.insert(module);
        }
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.index.get(name).map(|&i| &self.modules[i])
    }

    /// Whether a module with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Modules in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Module names in discovery order.
    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    /// Modules carrying a `@group` tag, in discovery order.
    pub fn with_group<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Module> + 'a {
        self.modules.iter().filter(move |m| m.has_group(tag))
    }

    /// Module owning a file: the deepest module whose directory contains it.
    pub fn find_by_file(&self, file: &Path) -> Option<&Module> {
        self.modules
            .iter()
            .filter(|m| m.contains_file(file))
            .max_by_key(|m| m.path().components().count())
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Discover every module reachable from `declarations`, relative to `base`.
pub fn discover(base: &Path, declarations: &[NestedModule]) -> ModuleTree {
    let mut seen = HashSet::new();
    discover_in(base, declarations, &mut seen)
}

fn discover_in(
    base: &Path,
    declarations: &[NestedModule],
    seen: &mut HashSet<PathBuf>,
) -> ModuleTree {
    let mut tree = ModuleTree::new();

    for declaration in declarations {
        if declaration.src.trim().is_empty() {
            warn!("Ignoring nested module declaration without src in {}", base.display());
            continue;
        }
        let path = normalize_path(&base.join(&declaration.src));
        if declaration.is_folder() {
            for child in child_directories(&path) {
                tree.extend(discover_module(&child, seen));
            }
        } else {
            tree.extend(discover_module(&path, seen));
        }
    }

    tree
}

fn discover_module(path: &Path, seen: &mut HashSet<PathBuf>) -> ModuleTree {
    let mut tree = ModuleTree::new();

    let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(key) {
        debug!("Module directory already visited: {}", path.display());
        return tree;
    }

    let Some(module) = Module::resolve(path) else {
        return tree;
    };
    debug!("Discovered module '{}' at {}", module.name(), module.path().display());

    let nested = discover_in(module.path(), module.nested_modules(), seen);
    tree.insert(module);
    tree.extend(nested);
    tree
}

/// Child directories of `dir`, sorted by name for a stable discovery order.
fn child_directories(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot scan module folder {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut children: Vec<PathBuf> =
        entries.filter_map(Result::ok).map(|e| e.path()).filter(|p| p.is_dir()).collect();
    children.sort();
    children
}
