//! nugup - outdated NuGet package checker library
//!
//! This library provides the engine behind the `nugup` CLI:
//! - Running `dotnet` with idle-timeout supervision
//! - Building the restore dependency graph and lock-file based analysis
//! - Resolving the latest allowed version from NuGet feeds
//! - Rewriting package versions in project and props files

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod nuspec;
pub mod orchestrator;
pub mod process;
pub mod progress;
pub mod registry;
pub mod resolver;
pub mod test_utils;
pub mod upgrade;
