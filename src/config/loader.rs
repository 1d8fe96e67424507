//! Configuration loading and discovery for `project.json` and `module.json`
//!
//! Both files are read leniently as JSON5, so comments and trailing commas
//! are accepted.

use super::schema::{ModuleConfig, ProjectConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// File name of a module descriptor inside a module directory
pub const MODULE_CONFIG_FILENAME: &str = "module.json";

/// File name of the project descriptor at the project root
pub const PROJECT_CONFIG_FILENAME: &str = "project.json";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read '{}': {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    /// JSON parsing error
    #[error("Failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },
    /// Validation error
    #[error("Invalid '{}':\n{}", path.display(), bullet_list(errors))]
    Validation { path: PathBuf, errors: Vec<String> },
}

fn bullet_list(errors: &[String]) -> String {
    errors.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n")
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Io { path: path.to_path_buf(), source: e })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, contents: &str) -> Result<T, ConfigError> {
    json5::from_str(contents)
        .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })
}

/// Load the `module.json` inside a module directory.
///
/// A descriptor without a usable `name` is a validation error.
pub fn load_module_config(dir: &Path) -> Result<ModuleConfig, ConfigError> {
    let path = dir.join(MODULE_CONFIG_FILENAME);
    let contents = read_file(&path)?;
    let config: ModuleConfig = parse(&path, &contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation {
            path,
            errors: errors.into_iter().map(|e| e.to_string()).collect(),
        });
    }

    Ok(config)
}

/// Load a project descriptor from a `project.json` path.
///
/// Validation problems are logged as warnings; only unreadable or unparsable
/// files are errors.
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let contents = read_file(path)?;
    let config: ProjectConfig = parse(path, &contents)?;

    for problem in config.validate() {
        warn!("{}: {}", path.display(), problem);
    }

    Ok(config)
}

/// Find `project.json` by walking up from the current working directory.
pub fn find_project() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_project_from)
}

/// Find `project.json` by walking up from a specific directory.
pub fn find_project_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(PROJECT_CONFIG_FILENAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}
