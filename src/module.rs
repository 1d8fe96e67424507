//! A located, configured unit of source.
//!
//! A [`Module`] owns its `module.json` configuration and answers path questions
//! about it: where its sources live, where each target language's output goes,
//! and which files it is willing to compile.
//!
//! Source-relative paths are strings with a leading `/` and forward slashes
//! (`/pkg/Item.bay`), independent of the host path separator.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::{load_module_config, ModuleConfig, NestedModule};
use crate::filter::PathFilter;
use crate::lang::{rewrite_extension, DIALECT_EXTENSIONS};

/// A resolved module.
///
/// Only modules whose directory holds a valid `module.json` exist as values
/// of this type; unresolved directories are never registered.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    path: PathBuf,
    config: ModuleConfig,
    filter: PathFilter,
}

impl Module {
    /// Build a module from an already loaded configuration.
    ///
    /// Returns `None` when the configuration does not name the module.
    pub fn from_config(path: impl AsRef<Path>, config: ModuleConfig) -> Option<Self> {
        let name = config.name.clone().filter(|n| !n.trim().is_empty())?;
        let filter = PathFilter::new(&config.allow, &config.exclude);
        Some(Self { name, path: normalize_path(path.as_ref()), config, filter })
    }

    /// Read `module.json` in `path` and build the module.
    ///
    /// Missing directories, unreadable or unparsable descriptors, and
    /// descriptors without a name all yield `None`.
    pub fn resolve(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            debug!("Not a module directory: {}", path.display());
            return None;
        }
        match load_module_config(path) {
            Ok(config) => Self::from_config(path, config),
            Err(e) => {
                debug!("Skipping unresolved module at {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration this module was built from.
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Compiled allow/exclude filter.
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Group tags (without the `@`).
    pub fn groups(&self) -> &[String] {
        &self.config.groups
    }

    /// Names of required modules.
    pub fn required_modules(&self) -> &[String] {
        &self.config.require
    }

    /// Asset file references, relative to the source root.
    pub fn assets(&self) -> &[String] {
        &self.config.assets
    }

    /// Nested module declarations.
    pub fn nested_modules(&self) -> &[NestedModule] {
        &self.config.modules
    }

    /// Absolute source root, if one is configured.
    pub fn source_root(&self) -> Option<PathBuf> {
        let src = self.config.src.as_deref()?;
        Some(normalize_path(&self.path.join(src)))
    }

    /// Absolute destination root for `lang`, if the module supports it.
    pub fn dest_root(&self, lang: &str) -> Option<PathBuf> {
        let dest = self.config.dest.get(lang)?;
        Some(normalize_path(&self.path.join(dest)))
    }

    /// Absolute path of a source-relative file.
    ///
    /// Returns `None` when there is no source root or when `..` segments lead
    /// out of it.
    pub fn source_file_path(&self, relative: &str) -> Option<PathBuf> {
        join_relative(&self.source_root()?, relative)
    }

    /// Path of `file` relative to the source root, with a leading `/`.
    ///
    /// Returns `None` when the file is not under the source root.
    pub fn relative_source_path(&self, file: &Path) -> Option<String> {
        let root = self.source_root()?;
        let file = normalize_path(file);
        let rest = file.strip_prefix(&root).ok()?;

        let mut relative = String::new();
        for component in rest.components() {
            relative.push('/');
            relative.push_str(&component.as_os_str().to_string_lossy());
        }
        if relative.is_empty() {
            return None;
        }
        Some(relative)
    }

    /// Whether `file` lies inside the module directory.
    ///
    /// Compares whole path segments, so `/proj/mod` does not contain `/proj/mod2`.
    pub fn contains_file(&self, file: &Path) -> bool {
        normalize_path(file).starts_with(&self.path)
    }

    /// Source file for a dotted class name qualified by this module's name.
    ///
    /// `Runtime.Web.Button` in module `Runtime` maps to `<src>/Web/Button.bay`.
    pub fn resolve_class_name(&self, qualified: &str) -> Option<PathBuf> {
        let rest = qualified.strip_prefix(self.name.as_str())?.strip_prefix('.')?;
        if rest.is_empty() {
            return None;
        }

        let mut path = self.source_root()?;
        let mut segments = rest.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{}.{}", segment, DIALECT_EXTENSIONS[0]));
            }
        }
        Some(path)
    }

    /// Output path of a source-relative file for `lang`.
    ///
    /// Dialect extensions are rewritten to the language's native extension.
    /// Returns `None` when the module has no destination root for `lang` or
    /// when the path would leave it.
    pub fn resolve_dest_file_path(&self, relative: &str, lang: &str) -> Option<PathBuf> {
        let root = self.dest_root(lang)?;
        join_relative(&root, &rewrite_extension(relative, lang))
    }

    /// Whether `tag` is an `@group` reference to one of this module's groups.
    pub fn has_group(&self, tag: &str) -> bool {
        match tag.strip_prefix('@') {
            Some(group) => self.config.groups.iter().any(|g| g == group),
            None => false,
        }
    }

    /// Whether a list of module names and `@group` references selects this module.
    pub fn in_module_list<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|n| n.as_ref() == self.name || self.has_group(n.as_ref()))
    }

    /// Allow-list check on a file name.
    pub fn is_allowed(&self, file_name: &str) -> bool {
        self.filter.is_allowed(file_name)
    }

    /// Exclude-list check on a source-relative path.
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.filter.is_excluded(relative)
    }

    /// Whether a source-relative path may be compiled.
    pub fn accepts(&self, relative: &str) -> bool {
        self.filter.accepts(relative)
    }
}

/// Join a `/`-separated relative path under `root`, staying inside it.
fn join_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    let path = normalize_path(&path);
    if path.starts_with(root) && path != root {
        Some(path)
    } else {
        None
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the parent.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
