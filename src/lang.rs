//! Language table for the dialect and its target languages.
//!
//! Maps language identifiers to their native source extension and classifies
//! source files by extension.

use std::path::Path;

/// Language identifier of the custom dialect.
pub const DIALECT: &str = "bay";

/// Extensions that identify dialect sources (`.bay` and the `.ui` template variant).
pub const DIALECT_EXTENSIONS: [&str; 2] = ["bay", "ui"];

/// Aggregation language used for asset bundles when none is declared.
pub const DEFAULT_ASSET_LANG: &str = "es6";

/// A known language and the extension its sources use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Language identifier as written in configuration files
    pub id: &'static str,
    /// Native source extension (without the dot)
    pub extension: &'static str,
}

const LANGUAGES: &[Language] = &[
    Language { id: DIALECT, extension: "bay" },
    Language { id: "php", extension: "php" },
    Language { id: "es6", extension: "js" },
    Language { id: "nodejs", extension: "js" },
];

/// Look up a known language by identifier.
pub fn language(id: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.id == id)
}

/// Native extension of a language, `None` for languages without a rewrite rule.
pub fn native_extension(lang: &str) -> Option<&'static str> {
    language(lang).map(|l| l.extension)
}

/// What kind of source a file is, judged by its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Dialect source, parsed into a syntax tree before translation
    Dialect,
    /// Source already written in a target language; carries its extension
    Native(String),
}

impl SourceKind {
    /// Whether raw content of this kind can be written for `lang` unchanged.
    pub fn passes_through_to(&self, lang: &str) -> bool {
        match self {
            SourceKind::Dialect => false,
            SourceKind::Native(ext) => native_extension(lang) == Some(ext.as_str()),
        }
    }
}

fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Classify a path by its extension.
///
/// Returns `None` for extensions outside the recognized set.
pub fn source_kind(path: &str) -> Option<SourceKind> {
    let ext = extension_of(path)?;
    if DIALECT_EXTENSIONS.contains(&ext) {
        return Some(SourceKind::Dialect);
    }
    LANGUAGES
        .iter()
        .filter(|l| l.id != DIALECT)
        .find(|l| l.extension == ext)
        .map(|l| SourceKind::Native(l.extension.to_string()))
}

/// Check whether a filesystem path has a recognized source extension.
pub fn is_source_file(path: &Path) -> bool {
    path.to_str().map(|p| source_kind(p).is_some()).unwrap_or(false)
}

/// Rewrite a dialect extension to the native extension of `lang`.
///
/// Paths that do not end in a dialect extension, and languages without a
/// known extension, are returned unchanged.
pub fn rewrite_extension(path: &str, lang: &str) -> String {
    let Some(target) = native_extension(lang) else {
        return path.to_string();
    };
    match extension_of(path) {
        Some(ext) if DIALECT_EXTENSIONS.contains(&ext) => {
            let stem = &path[..path.len() - ext.len()];
            format!("{}{}", stem, target)
        }
        _ => path.to_string(),
    }
}
