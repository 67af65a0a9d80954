//! Core domain models for nugup
//!
//! This module contains the fundamental types used throughout the application:
//! - NuGet versions, version ranges and floating behaviors
//! - Target framework monikers
//! - Project specifications from the restore graph
//! - The dependency graph arena
//! - Dependency and analysis result structures

mod dependency;
mod framework;
mod graph;
mod package_spec;
mod version;
mod version_range;

pub use dependency::{AnalyzedDependency, Dependency, UpgradeSeverity};
pub use framework::{FrameworkIdentifier, TargetFramework};
pub use graph::{DependencyEdge, DependencyGraph, DependencyNode, PackageKey, TransitiveVisit};
pub use package_spec::{
    DependencyGraphSpec, DependencySpec, PackageSpec, Project, ProjectStyle, ProjectTarget,
    RestoreMetadata, TargetFrameworkSpec,
};
pub use version::NuGetVersion;
pub use version_range::{FloatBehavior, FloatRange, VersionRange};
