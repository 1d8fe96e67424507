//! Build result types.
//!
//! A [`BuildResult`] records one entry per scanned source file, in compile
//! order, and reports them grouped by module.

use std::path::PathBuf;
use std::time::Duration;

use crate::build::SkipReason;

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Outputs written, in language order
    Compiled(Vec<PathBuf>),
    /// Nothing to do for this file
    Skipped(SkipReason),
    /// Compile failed with this message
    Failed(String),
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Compiled(outputs) => write!(f, "compiled ({} outputs)", outputs.len()),
            FileStatus::Skipped(reason) => write!(f, "skipped: {}", reason),
            FileStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of compiling one source file.
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Owning module
    pub module: String,
    /// Source-relative path (`/pkg/Item.bay`)
    pub path: String,
    pub status: FileStatus,
    pub duration: Duration,
}

impl FileResult {
    pub fn new(module: &str, path: &str, status: FileStatus, duration: Duration) -> Self {
        Self { module: module.to_string(), path: path.to_string(), status, duration }
    }

    /// `Module:/path` label used in logs.
    pub fn label(&self) -> String {
        format!("{}:{}", self.module, self.path)
    }

    /// Files written for this source.
    pub fn outputs(&self) -> &[PathBuf] {
        match &self.status {
            FileStatus::Compiled(outputs) => outputs,
            _ => &[],
        }
    }

    /// The failure message, if the compile failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FileStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}

/// Per-module tally of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleReport {
    pub name: String,
    pub compiled: usize,
    pub skipped: usize,
    /// `(path, message)` for every failed file
    pub failures: Vec<(String, String)>,
}

impl ModuleReport {
    fn record(&mut self, file: &FileResult) {
        match &file.status {
            FileStatus::Compiled(_) => self.compiled += 1,
            FileStatus::Skipped(_) => self.skipped += 1,
            FileStatus::Failed(err) => self.failures.push((file.path.clone(), err.clone())),
        }
    }

    fn counts(&self) -> String {
        let mut parts = vec![format!("{} compiled", self.compiled)];
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if !self.failures.is_empty() {
            parts.push(format!("{} failed", self.failures.len()));
        }
        parts.join(", ")
    }
}

/// Result of a module or project compile.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// One entry per source file, in compile order
    pub files: Vec<FileResult>,
    pub total_duration: Duration,
}

impl BuildResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: FileResult) {
        self.files.push(result);
    }

    /// Append every file result of another build.
    pub fn merge(&mut self, other: BuildResult) {
        self.files.extend(other.files);
        self.total_duration += other.total_duration;
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Tallies per module, in the order modules were first compiled.
    pub fn modules(&self) -> Vec<ModuleReport> {
        let mut reports: Vec<ModuleReport> = Vec::new();
        for file in &self.files {
            let index = match reports.iter().position(|r| r.name == file.module) {
                Some(index) => index,
                None => {
                    reports.push(ModuleReport { name: file.module.clone(), ..Default::default() });
                    reports.len() - 1
                }
            };
            reports[index].record(file);
        }
        reports
    }

    pub fn success_count(&self) -> usize {
        self.files.iter().filter(|f| matches!(f.status, FileStatus::Compiled(_))).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files.iter().filter(|f| matches!(f.status, FileStatus::Skipped(_))).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failure()).count()
    }

    /// No file failed.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.files.iter().flat_map(|f| f.outputs()).collect()
    }

    pub fn failures(&self) -> Vec<&FileResult> {
        self.files.iter().filter(|f| f.is_failure()).collect()
    }

    /// Headline followed by one line per module, failures listed beneath
    /// their module.
    pub fn summary(&self) -> String {
        let verdict = if self.is_success() { "Build succeeded" } else { "Build failed" };
        let mut lines = vec![format!(
            "{}: {} modules, {} files in {:?}",
            verdict,
            self.modules().len(),
            self.files.len(),
            self.total_duration
        )];

        for module in self.modules() {
            lines.push(format!("  {}: {}", module.name, module.counts()));
            for (path, err) in &module.failures {
                lines.push(format!("    {}: {}", path, err));
            }
        }
        lines.join("\n")
    }
}
