//! Project snapshots.
//!
//! A snapshot is a flat, serializable record of a project and every resolved
//! module. Restoring one rebuilds the [`Project`] without walking the
//! filesystem again.
//!
//! ```json
//! {
//!   "version": 1,
//!   "root": "/work/demo",
//!   "config": { "name": "Demo", "languages": ["bay", "php"], ... },
//!   "modules": [
//!     { "exists": true, "path": "/work/demo/lib/Runtime", "name": "Runtime", "src": "src", ... }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{ModuleConfig, ProjectConfig};
use crate::module::Module;
use crate::project::Project;
use crate::tree::ModuleTree;

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// Default snapshot filename.
pub const SNAPSHOT_FILENAME: &str = ".baymake-snapshot.json";

/// Error during snapshot operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Version mismatch
    #[error("Snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// One module as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    /// Whether the module resolved when captured
    pub exists: bool,
    /// Module directory
    pub path: PathBuf,
    /// The module's configuration (name, roots, assets, groups, ...)
    #[serde(flatten)]
    pub config: ModuleConfig,
}

/// A project and its modules, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Snapshot format version
    pub version: u32,
    /// Project root directory
    pub root: PathBuf,
    /// Project configuration
    pub config: ProjectConfig,
    /// Modules in discovery order
    pub modules: Vec<ModuleSnapshot>,
}

impl ProjectSnapshot {
    /// Record the current state of `project`.
    pub fn capture(project: &Project) -> Self {
        let modules = project
            .modules()
            .iter()
            .map(|m| ModuleSnapshot {
                exists: true,
                path: m.path().to_path_buf(),
                config: m.config().clone(),
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            root: project.root().to_path_buf(),
            config: project.config().clone(),
            modules,
        }
    }

    /// Rebuild the project. Modules that did not exist are left out.
    pub fn restore(self) -> Project {
        let modules = self
            .modules
            .into_iter()
            .filter(|m| m.exists)
            .filter_map(|m| Module::from_config(&m.path, m.config));
        Project::new(self.root, self.config, ModuleTree::from_modules(modules))
    }

    /// Load a snapshot from a file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(path)?);
        let snapshot: ProjectSnapshot = serde_json::from_reader(reader)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }

        debug!("Loaded snapshot of {} modules from {}", snapshot.modules.len(), path.display());
        Ok(Some(snapshot))
    }

    /// Save the snapshot to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
