//! Asset bundling.
//!
//! An asset bundle concatenates the asset files of an ordered set of modules
//! into one output file. For every entry the already translated output is
//! preferred; a raw source already in the bundle language is used as is.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::AssetConfig;
use crate::graph::DependencyError;
use crate::lang::{native_extension, source_kind, SourceKind};
use crate::module::Module;
use crate::project::Project;

/// Error that stops a bundle from being written.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssetError {
    /// The bundle file could not be written
    #[error("Failed to write asset '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    /// The bundle's modules could not be ordered
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Builds the asset bundles declared by a project.
#[derive(Debug, Clone, Copy)]
pub struct AssetBundler<'p> {
    project: &'p Project,
}

impl<'p> AssetBundler<'p> {
    /// Create a bundler for `project`.
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }

    /// Build one bundle.
    ///
    /// Returns the written path, or `None` when the bundle has no destination.
    pub fn build_asset(&self, asset: &AssetConfig) -> Result<Option<PathBuf>, AssetError> {
        let Some(dest) = self.project.asset_path(asset) else {
            debug!("Asset without destination skipped");
            return Ok(None);
        };

        let modules = self.project.resolve_asset_modules(asset)?;
        let content = self.bundle_content(&modules, asset.lang());

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AssetError::Io { path: dest.clone(), source: e })?;
        }
        fs::write(&dest, content).map_err(|e| AssetError::Io { path: dest.clone(), source: e })?;

        info!("Built asset {} from {} modules", dest.display(), modules.len());
        Ok(Some(dest))
    }

    /// Concatenated content of the listed modules' asset entries for `lang`.
    ///
    /// Every included entry is followed by a newline. Unknown modules and
    /// entries with no usable file are skipped.
    pub fn bundle_content<S: AsRef<str>>(&self, modules: &[S], lang: &str) -> String {
        let mut content = String::new();
        for name in modules {
            let Some(module) = self.project.get_module(name.as_ref()) else {
                debug!("Asset module '{}' not found", name.as_ref());
                continue;
            };
            for entry in module.assets() {
                if let Some(text) = read_entry(module, entry, lang) {
                    content.push_str(&text);
                    content.push('\n');
                }
            }
        }
        content
    }

    /// Rebuild every bundle that includes `module`.
    pub fn update_assets(&self, module: &Module) -> Result<Vec<PathBuf>, AssetError> {
        let mut written = Vec::new();
        for asset in self.project.project_assets(module) {
            written.extend(self.build_asset(asset)?);
        }
        Ok(written)
    }

    /// Build every declared bundle.
    pub fn build_all(&self) -> Result<Vec<PathBuf>, AssetError> {
        let mut written = Vec::new();
        for asset in self.project.assets() {
            written.extend(self.build_asset(asset)?);
        }
        Ok(written)
    }
}

fn read_entry(module: &Module, entry: &str, lang: &str) -> Option<String> {
    if let Some(translated) = module.resolve_dest_file_path(entry, lang) {
        if let Some(text) = read_existing(&translated) {
            return Some(text);
        }
    }

    let passes = match source_kind(entry) {
        Some(kind @ SourceKind::Native(_)) => kind.passes_through_to(lang),
        _ => false,
    };
    if passes {
        if let Some(text) = module.source_file_path(entry).and_then(|p| read_existing(&p)) {
            return Some(text);
        }
    }

    debug!(
        "Asset entry {}:{} has no {} output",
        module.name(),
        entry,
        native_extension(lang).unwrap_or(lang)
    );
    None
}

fn read_existing(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            None
        }
    }
}
