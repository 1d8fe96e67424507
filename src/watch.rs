//! Watch mode for automatic recompiles on file changes
//!
//! Watches the project root with debouncing. Every changed source file is
//! compiled on its own and the asset bundles that include its module are
//! rebuilt.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{AssetBundler, CompileOutcome, Compiler};
use crate::config::WatchConfig;
use crate::lang::is_source_file;
use crate::project::Project;
use crate::translate::Parser;

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    ChannelError(String),
    /// Project root not found
    #[error("Project root not found: {}", .0.display())]
    RootNotFound(PathBuf),
}

/// What happened to one changed file.
#[derive(Debug)]
pub struct ChangeReport {
    /// The changed file
    pub file: PathBuf,
    /// Owning module
    pub module: String,
    /// Compile outcome, or the error message
    pub outcome: Result<CompileOutcome, String>,
    /// Asset bundles rewritten afterwards
    pub assets: Vec<PathBuf>,
}

impl ChangeReport {
    /// Whether compiling the file failed.
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Tracks files with errors across changes for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    files_with_errors: HashSet<PathBuf>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch of changes, returns the files that no longer fail
    pub fn update(&mut self, reports: &[ChangeReport]) -> Vec<PathBuf> {
        let mut fixed = Vec::new();
        for report in reports {
            if report.is_failure() {
                self.files_with_errors.insert(report.file.clone());
            } else if self.files_with_errors.remove(&report.file) {
                fixed.push(report.file.clone());
            }
        }
        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.files_with_errors.is_empty()
    }

    /// Get the number of files with errors
    pub fn error_count(&self) -> usize {
        self.files_with_errors.len()
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory to watch
    pub root: PathBuf,
    /// Watch configuration (debounce, clear screen)
    pub config: WatchConfig,
    /// Compile everything once before watching
    pub initial_build: bool,
}

impl WatchOptions {
    /// Options taken from a project's `watch` settings.
    pub fn for_project(project: &Project) -> Self {
        Self {
            root: project.root().to_path_buf(),
            config: project.config().watch.clone(),
            initial_build: true,
        }
    }
}

/// Debounce delay, at least one millisecond.
fn debounce(config: &WatchConfig) -> Duration {
    Duration::from_millis(u64::from(config.debounce_ms.max(1)))
}

/// Whether a changed path can be compiled
pub fn is_relevant_file(path: &Path) -> bool {
    is_source_file(path)
}

/// Compile one changed file and rebuild the bundles of its module.
///
/// Returns `None` when the file does not belong to the source root of any
/// module.
pub fn handle_change<P: Parser>(
    compiler: &Compiler<'_, P>,
    file: &Path,
) -> Option<ChangeReport> {
    let project = compiler.project();
    let module = project.find_module_by_file(file)?;
    let relative = module.relative_source_path(file)?;

    let outcome = compiler.compile(module, &relative, None).map_err(|e| e.to_string());

    let mut assets = Vec::new();
    if matches!(outcome, Ok(CompileOutcome::Compiled(_))) {
        match AssetBundler::new(project).update_assets(module) {
            Ok(written) => assets = written,
            Err(e) => warn!("Asset update for '{}' failed: {}", module.name(), e),
        }
    }

    Some(ChangeReport {
        file: file.to_path_buf(),
        module: module.name().to_string(),
        outcome,
        assets,
    })
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

fn initial_build<P: Parser>(compiler: &Compiler<'_, P>, tracker: &mut ErrorTracker) {
    let start = Instant::now();
    match compiler.compile_all() {
        Ok(result) => {
            let reports: Vec<ChangeReport> = result
                .failures()
                .into_iter()
                .filter_map(|f| {
                    let module = compiler.project().get_module(&f.module)?;
                    Some(ChangeReport {
                        file: module.source_file_path(&f.path)?,
                        module: f.module.clone(),
                        outcome: Err(f.error().unwrap_or_default().to_string()),
                        assets: vec![],
                    })
                })
                .collect();
            tracker.update(&reports);
            info!("{}", result.summary());
        }
        Err(e) => warn!("Build failed: {}", e),
    }
    if let Err(e) = AssetBundler::new(compiler.project()).build_all() {
        warn!("Asset build failed: {}", e);
    }
    info!("Initial build finished in {}", format_duration(start.elapsed()));
}

fn report_changes(reports: &[ChangeReport], fixed: &[PathBuf], elapsed: Duration) {
    for file in fixed {
        info!("Fixed: {}", file.display());
    }
    for report in reports {
        match &report.outcome {
            Ok(CompileOutcome::Compiled(outputs)) => {
                info!("Compiled {} ({} outputs)", report.file.display(), outputs.len())
            }
            Ok(CompileOutcome::Skipped(reason)) => {
                debug!("Skipped {}: {}", report.file.display(), reason)
            }
            Err(e) => warn!("{}", e),
        }
        for asset in &report.assets {
            info!("Updated asset {}", asset.display());
        }
    }
    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed == 0 {
        info!("Rebuild complete ({})", format_duration(elapsed));
    } else {
        warn!(
            "Rebuild failed ({}) - {} error{}",
            format_duration(elapsed),
            failed,
            if failed == 1 { "" } else { "s" }
        );
    }
}

/// Watch the project for changes and recompile automatically.
///
/// Blocks until the watcher channel closes.
pub fn watch_project<P: Parser>(
    compiler: &Compiler<'_, P>,
    options: &WatchOptions,
) -> Result<(), WatchError> {
    if !options.root.is_dir() {
        return Err(WatchError::RootNotFound(options.root.clone()));
    }

    let (tx, rx) = channel();
    let debounce_duration = debounce(&options.config);
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;
    debouncer
        .watcher()
        .watch(&options.root, RecursiveMode::Recursive)
        .map_err(WatchError::WatchPath)?;

    let mut error_tracker = ErrorTracker::new();
    if options.initial_build {
        if options.config.clear_screen {
            clear_screen();
        }
        initial_build(compiler, &mut error_tracker);
    }
    info!("Watching {} for changes...", options.root.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: BTreeSet<PathBuf> = events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path)
                    .filter(|p| is_relevant_file(p))
                    .collect();
                if changed.is_empty() {
                    continue;
                }

                if options.config.clear_screen {
                    clear_screen();
                }
                let start = Instant::now();
                let reports: Vec<ChangeReport> =
                    changed.iter().filter_map(|file| handle_change(compiler, file)).collect();
                let fixed = error_tracker.update(&reports);
                report_changes(&reports, &fixed, start.elapsed());
            }
            Ok(Err(e)) => {
                warn!("Watch error: {}", e);
            }
            Err(e) => {
                return Err(WatchError::ChannelError(e.to_string()));
            }
        }
    }
}
