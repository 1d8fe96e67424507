//! Allow/exclude filtering of candidate source files inside a module.
//!
//! Allow patterns are globs matched against the file name. A pattern starting
//! with `!` is negative. Every pattern is evaluated in declared order and the
//! last one that matches decides.
//!
//! Exclude patterns are regular expressions searched in the module-relative
//! path. Any match excludes the file.

use glob::Pattern;
use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone)]
struct AllowRule {
    pattern: Pattern,
    negative: bool,
}

/// Compiled allow and exclude patterns of one module.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    allow: Vec<AllowRule>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    /// Compile allow and exclude patterns.
    ///
    /// Blank patterns are dropped. Patterns that fail to compile are logged
    /// and dropped; a broken pattern never makes the whole module unusable.
    pub fn new(allow: &[String], exclude: &[String]) -> Self {
        let allow = allow
            .iter()
            .filter_map(|raw| {
                let trimmed = raw.trim();
                let (negative, glob) = match trimmed.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, trimmed),
                };
                if glob.is_empty() {
                    return None;
                }
                match Pattern::new(glob) {
                    Ok(pattern) => Some(AllowRule { pattern, negative }),
                    Err(e) => {
                        warn!("Ignoring invalid allow pattern '{}': {}", raw, e);
                        None
                    }
                }
            })
            .collect();

        let exclude = exclude
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .filter_map(|raw| match Regex::new(raw) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid exclude pattern '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        Self { allow, exclude }
    }

    /// Whether any allow pattern is configured.
    pub fn has_allow_list(&self) -> bool {
        !self.allow.is_empty()
    }

    /// Evaluate the allow-list against a file name.
    ///
    /// Returns `false` when no allow pattern is configured.
    pub fn is_allowed(&self, file_name: &str) -> bool {
        let mut allowed = false;
        for rule in &self.allow {
            if rule.pattern.matches(file_name) {
                allowed = !rule.negative;
            }
        }
        allowed
    }

    /// Whether a module-relative path matches any exclude pattern.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        if relative_path.is_empty() {
            return false;
        }
        self.exclude.iter().any(|re| re.is_match(relative_path))
    }

    /// Combined decision used before compiling a file.
    ///
    /// An empty allow-list imposes no restriction; the exclude-list always wins.
    pub fn accepts(&self, relative_path: &str) -> bool {
        if self.is_excluded(relative_path) {
            return false;
        }
        if !self.has_allow_list() {
            return true;
        }
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.is_allowed(file_name)
    }
}
