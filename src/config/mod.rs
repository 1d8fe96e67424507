//! Configuration module for projects and modules
//!
//! Provides types and parsing for `project.json` and `module.json`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
