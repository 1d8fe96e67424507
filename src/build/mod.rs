//! Build pipeline module for baymake
//!
//! Turns module sources into per-language outputs and bundles them into
//! project assets.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Compile**: parse a dialect file once and translate it for every
//!   target language the module has a destination for
//! - **Assets**: concatenate module asset files, in dependency order, into
//!   the bundles declared by the project
//!
//! # Example
//!
//! ```ignore
//! use baymake::build::{AssetBundler, Compiler};
//! use baymake::project::Project;
//!
//! let project = Project::find(".")?;
//! let compiler = Compiler::new(&project, parser, translators);
//!
//! let result = compiler.compile_all()?;
//! println!("{}", result.summary());
//! AssetBundler::new(&project).build_all()?;
//! ```

pub mod assets;
pub mod pipeline;
pub mod result;

pub use assets::*;
pub use pipeline::*;
pub use result::*;
