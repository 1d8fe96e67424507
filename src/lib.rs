//! baymake - module orchestration for a multi-target source-to-source compiler
//!
//! This library provides functionality to:
//! - Discover a project's module tree from `project.json` and `module.json` files
//! - Order modules by their declared dependencies and `@group` tags
//! - Compile dialect sources into every configured target language
//! - Bundle module outputs into aggregate asset files
//! - Watch a project and recompile on change

pub mod build;
pub mod config;
pub mod filter;
pub mod graph;
pub mod lang;
pub mod module;
pub mod project;
pub mod snapshot;
pub mod translate;
pub mod tree;
pub mod watch;
