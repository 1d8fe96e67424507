//! Per-file compile pipeline.
//!
//! Locates a source file inside its module, filters it, parses dialect
//! sources, translates to every requested language and writes the outputs.
//! All outputs of one file are rendered in memory before anything is written,
//! so a parse failure leaves no partial output behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use glob::{glob, Pattern};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{BuildResult, FileResult, FileStatus};
use crate::graph::DependencyError;
use crate::lang::{is_source_file, source_kind, SourceKind};
use crate::module::Module;
use crate::project::Project;
use crate::translate::{ParseError, Parser, TranslatorRegistry};

/// Error that aborts the compile of one file (or of a whole build).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The dialect parser rejected the file
    #[error("Parse error in '{}' (module '{module}'): {source}", file.display())]
    Parse { module: String, file: PathBuf, source: ParseError },
    /// A source file could not be read
    #[error("Failed to read '{}': {source}", file.display())]
    Read { file: PathBuf, source: io::Error },
    /// An output file could not be written
    #[error("Failed to write '{}': {source}", file.display())]
    Write { file: PathBuf, source: io::Error },
    /// No module with this name
    #[error("Unknown module '{0}'")]
    UnknownModule(String),
    /// Modules could not be ordered
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Why a compile request produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The module has no source root
    NoSourceRoot,
    /// The file is not inside the module (or not under its source root)
    OutsideModule,
    /// The module's filter rejects the file
    Excluded,
    /// The extension is not a recognized source extension
    UnrecognizedExtension,
    /// The file does not exist
    NotFound,
    /// No requested language had both a destination and a translator
    NoOutputs,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoSourceRoot => write!(f, "module has no source root"),
            SkipReason::OutsideModule => write!(f, "outside module source root"),
            SkipReason::Excluded => write!(f, "excluded by module filter"),
            SkipReason::UnrecognizedExtension => write!(f, "unrecognized extension"),
            SkipReason::NotFound => write!(f, "file not found"),
            SkipReason::NoOutputs => write!(f, "no target language produced output"),
        }
    }
}

/// Outcome of a compile request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Output files written, in language order
    Compiled(Vec<PathBuf>),
    /// Nothing was done
    Skipped(SkipReason),
}

impl CompileOutcome {
    /// Whether anything was written.
    pub fn is_compiled(&self) -> bool {
        matches!(self, CompileOutcome::Compiled(_))
    }
}

enum Content<A> {
    Tree(A),
    Raw(String, SourceKind),
}

/// Compiles module sources of one project.
pub struct Compiler<'p, P: Parser> {
    project: &'p Project,
    parser: P,
    translators: TranslatorRegistry<P::Ast>,
}

impl<'p, P: Parser> Compiler<'p, P> {
    /// Assemble a compiler from a parser and the translators per language.
    pub fn new(project: &'p Project, parser: P, translators: TranslatorRegistry<P::Ast>) -> Self {
        Self { project, parser, translators }
    }

    /// The project being compiled.
    pub fn project(&self) -> &'p Project {
        self.project
    }

    /// Compile one source-relative file of `module`.
    ///
    /// With `lang` set, only that language is produced; otherwise every
    /// declared target language except the dialect itself.
    pub fn compile(
        &self,
        module: &Module,
        relative: &str,
        lang: Option<&str>,
    ) -> Result<CompileOutcome, CompileError> {
        if module.source_root().is_none() {
            return Ok(CompileOutcome::Skipped(SkipReason::NoSourceRoot));
        }
        let Some(file) = module.source_file_path(relative) else {
            return Ok(CompileOutcome::Skipped(SkipReason::OutsideModule));
        };
        // `/pkg/../Item.bay` is filtered and placed as `/Item.bay`
        let Some(relative) = module.relative_source_path(&file) else {
            return Ok(CompileOutcome::Skipped(SkipReason::OutsideModule));
        };
        let relative = relative.as_str();
        if !module.accepts(relative) {
            debug!("Excluded by filter: {}:{}", module.name(), relative);
            return Ok(CompileOutcome::Skipped(SkipReason::Excluded));
        }
        let Some(kind) = source_kind(relative) else {
            return Ok(CompileOutcome::Skipped(SkipReason::UnrecognizedExtension));
        };
        if !file.is_file() {
            return Ok(CompileOutcome::Skipped(SkipReason::NotFound));
        }

        let text = fs::read_to_string(&file)
            .map_err(|e| CompileError::Read { file: file.clone(), source: e })?;
        let content = match kind {
            SourceKind::Dialect => {
                let ast = self.parser.parse(&text, &file).map_err(|e| CompileError::Parse {
                    module: module.name().to_string(),
                    file: file.clone(),
                    source: e,
                })?;
                Content::Tree(ast)
            }
            native => Content::Raw(text, native),
        };

        let languages: Vec<&str> = match lang {
            Some(lang) => vec![lang],
            None => self.project.target_languages().collect(),
        };

        let mut rendered = Vec::new();
        for lang in languages {
            let Some(dest) = module.resolve_dest_file_path(relative, lang) else {
                debug!("No '{}' destination in module '{}'", lang, module.name());
                continue;
            };
            let output = match &content {
                Content::Tree(ast) => match self.translators.get(lang) {
                    Some(translator) => translator.translate(ast),
                    None => {
                        debug!("No translator registered for '{}'", lang);
                        continue;
                    }
                },
                Content::Raw(text, kind) => {
                    if !kind.passes_through_to(lang) {
                        continue;
                    }
                    text.clone()
                }
            };
            rendered.push((dest, output));
        }

        if rendered.is_empty() {
            return Ok(CompileOutcome::Skipped(SkipReason::NoOutputs));
        }

        let mut outputs = Vec::with_capacity(rendered.len());
        for (dest, output) in rendered {
            write_output(&dest, &output)?;
            info!("Wrote {}", dest.display());
            outputs.push(dest);
        }
        Ok(CompileOutcome::Compiled(outputs))
    }

    /// Compile an absolute source path, locating its module first.
    pub fn compile_file(&self, file: &Path) -> Result<CompileOutcome, CompileError> {
        let Some(module) = self.project.find_module_by_file(file) else {
            return Ok(CompileOutcome::Skipped(SkipReason::OutsideModule));
        };
        let Some(relative) = module.relative_source_path(file) else {
            return Ok(CompileOutcome::Skipped(SkipReason::OutsideModule));
        };
        self.compile(module, &relative, None)
    }

    /// Compile every source file of a module.
    ///
    /// Failures are recorded per file and do not stop the remaining files.
    pub fn compile_module(&self, name: &str) -> Result<BuildResult, CompileError> {
        let module = self
            .project
            .get_module(name)
            .ok_or_else(|| CompileError::UnknownModule(name.to_string()))?;

        let start = Instant::now();
        let mut result = BuildResult::new();
        for relative in source_files(module) {
            let file_start = Instant::now();
            let status = match self.compile(module, &relative, None) {
                Ok(CompileOutcome::Compiled(outputs)) => FileStatus::Compiled(outputs),
                Ok(CompileOutcome::Skipped(reason)) => {
                    debug!("Skipped {}:{} ({})", name, relative, reason);
                    FileStatus::Skipped(reason)
                }
                Err(e) => {
                    warn!("{}", e);
                    FileStatus::Failed(e.to_string())
                }
            };
            result.add_result(FileResult::new(name, &relative, status, file_start.elapsed()));
        }
        Ok(result.with_duration(start.elapsed()))
    }

    /// Compile every module, dependencies first.
    pub fn compile_all(&self) -> Result<BuildResult, CompileError> {
        let start = Instant::now();
        let order = self.project.sort_required_modules(self.project.modules().names().as_slice())?;

        let mut result = BuildResult::new();
        for name in order {
            result.merge(self.compile_module(&name)?);
        }
        Ok(result.with_duration(start.elapsed()))
    }
}

/// Source-relative paths of every recognized source file of a module, sorted.
pub fn source_files(module: &Module) -> Vec<String> {
    let Some(root) = module.source_root() else {
        return Vec::new();
    };
    let pattern = format!("{}/**/*", Pattern::escape(&root.to_string_lossy()));

    let paths = match glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Cannot scan {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<String> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file() && is_source_file(p))
        .filter_map(|p| module.relative_source_path(&p))
        .collect();
    files.sort();
    files
}

fn write_output(dest: &Path, content: &str) -> Result<(), CompileError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CompileError::Write { file: dest.to_path_buf(), source: e })?;
    }
    fs::write(dest, content)
        .map_err(|e| CompileError::Write { file: dest.to_path_buf(), source: e })
}
