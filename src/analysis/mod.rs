//! Dependency discovery
//!
//! - `graph_builder`: restore graph generation and parsing
//! - `lock_file`: `project.assets.json` reading
//! - `analyzer`: per-framework dependency lists with optional transitive expansion

mod analyzer;
mod graph_builder;
mod lock_file;

pub use analyzer::{analyze_project, AnalyzeOptions, ProjectAnalyzer};
pub use graph_builder::{parse_graph_document, GraphBuilder};
pub use lock_file::{LockFile, LockLibrary, LockTarget, ASSETS_FILE_NAME};
