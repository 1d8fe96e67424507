//! Configuration schema types for `module.json` and `project.json`
//!
//! Defines the structure and validation rules for module and project
//! descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lang::DEFAULT_ASSET_LANG;

/// Nested module declaration kind value meaning "one module per child directory"
pub const FOLDER_KIND: &str = "folder";

/// A nested module declaration inside a module or project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedModule {
    /// Path relative to the declaring directory
    pub src: String,
    /// `"folder"` scans `src` for one module per child entry; anything else
    /// (or nothing) means `src` is itself a module
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl NestedModule {
    /// Declare a single module at `src`.
    pub fn module(src: impl Into<String>) -> Self {
        Self { src: src.into(), kind: None }
    }

    /// Declare a folder of modules at `src`.
    pub fn folder(src: impl Into<String>) -> Self {
        Self { src: src.into(), kind: Some(FOLDER_KIND.to_string()) }
    }

    /// Whether this declaration is a folder of modules.
    pub fn is_folder(&self) -> bool {
        self.kind.as_deref() == Some(FOLDER_KIND)
    }
}

/// Contents of a `module.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Unique module identifier (required for the module to resolve)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source root, relative to the module directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Destination root per target language, relative to the module directory
    #[serde(default)]
    pub dest: BTreeMap<String, String>,
    /// Allow patterns (globs over file names, `!` negates)
    #[serde(default)]
    pub allow: Vec<String>,
    /// Exclude patterns (regular expressions over module-relative paths)
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Files contributed to asset bundles, relative to the source root
    #[serde(default)]
    pub assets: Vec<String>,
    /// Group tags, referenced elsewhere as `@tag`
    #[serde(default)]
    pub groups: Vec<String>,
    /// Names of modules this module depends on
    #[serde(default)]
    pub require: Vec<String>,
    /// Nested module declarations
    #[serde(default)]
    pub modules: Vec<NestedModule>,
}

impl ModuleConfig {
    /// Validate the configuration and return all errors found
    ///
    /// Only the name decides whether a module resolves; bad nested
    /// declarations are skipped during discovery instead.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        match self.name.as_deref() {
            None => errors.push(ConfigValidationError {
                field: "name".to_string(),
                message: "is required".to_string(),
            }),
            Some(name) if name.trim().is_empty() => errors.push(ConfigValidationError {
                field: "name".to_string(),
                message: "must be a non-empty string".to_string(),
            }),
            Some(name) if name.starts_with('@') => errors.push(ConfigValidationError {
                field: "name".to_string(),
                message: "must not start with '@' (reserved for group references)".to_string(),
            }),
            Some(_) => {}
        }

        errors
    }
}

/// One aggregate asset declared by the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Destination path, relative to the project root
    pub dest: String,
    /// Module names or `@group` references, in bundle order
    #[serde(default)]
    pub modules: Vec<String>,
    /// Language whose translated output is concatenated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl AssetConfig {
    /// Effective aggregation language.
    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or(DEFAULT_ASSET_LANG)
    }
}

/// Watch mode settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Contents of a `project.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Project kind (e.g. `"web"`, `"lib"`)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Target languages, in build order
    #[serde(default)]
    pub languages: Vec<String>,
    /// Aggregate assets
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    /// Top-level module declarations, relative to the project root
    #[serde(default)]
    pub modules: Vec<NestedModule>,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl ProjectConfig {
    /// Validate the configuration and return all problems found
    ///
    /// These are diagnostics: the loader logs them and keeps the project.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        for (i, lang) in self.languages.iter().enumerate() {
            if lang.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("languages[{}]", i),
                    message: "must be a non-empty language identifier".to_string(),
                });
            }
        }

        for (i, asset) in self.assets.iter().enumerate() {
            // A blank dest is allowed and disables the bundle.
            if asset.modules.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("assets[{}].modules", i),
                    message: "must reference at least one module or group".to_string(),
                });
            }
        }

        for (i, module) in self.modules.iter().enumerate() {
            if module.src.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("modules[{}].src", i),
                    message: "must be a non-empty path".to_string(),
                });
            }
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Validation error for configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "assets[0].modules")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
