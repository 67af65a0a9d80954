//! Project specifications as described by the restore graph document,
//! and the analyzed projects built from them

use super::{Dependency, TargetFramework, VersionRange};
use std::fmt;
use std::path::PathBuf;

/// How a project declares its packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectStyle {
    PackageReference,
    PackagesConfig,
    ProjectJson,
    DotnetCliTool,
    Standalone,
    DotnetToolReference,
    Unknown,
}

impl ProjectStyle {
    /// Parse the `projectStyle` value of the graph document
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "packagereference" => ProjectStyle::PackageReference,
            "packagesconfig" => ProjectStyle::PackagesConfig,
            "projectjson" => ProjectStyle::ProjectJson,
            "dotnetclitool" => ProjectStyle::DotnetCliTool,
            "standalone" => ProjectStyle::Standalone,
            "dotnettoolreference" => ProjectStyle::DotnetToolReference,
            _ => ProjectStyle::Unknown,
        }
    }
}

impl fmt::Display for ProjectStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Restore settings of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreMetadata {
    pub project_name: String,
    pub project_path: PathBuf,
    /// Folder holding `project.assets.json`
    pub output_path: PathBuf,
    /// Global packages folder
    pub packages_path: Option<PathBuf>,
    pub project_style: ProjectStyle,
    /// Package source URIs
    pub sources: Vec<String>,
}

/// A declared package dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub version_range: Option<VersionRange>,
    pub auto_referenced: bool,
    pub centrally_managed: bool,
}

/// A target framework section of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFrameworkSpec {
    /// The alias the project uses, e.g. `net8.0`
    pub alias: String,
    pub framework: TargetFramework,
    pub dependencies: Vec<DependencySpec>,
}

/// One project of the restore graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Unique project identifier (the key in the graph document)
    pub id: String,
    pub name: String,
    pub file_path: PathBuf,
    pub restore: RestoreMetadata,
    pub target_frameworks: Vec<TargetFrameworkSpec>,
}

impl PackageSpec {
    /// Declared package sources
    pub fn sources(&self) -> &[String] {
        &self.restore.sources
    }
}

/// All projects the build tool reported for one entry manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraphSpec {
    pub projects: Vec<PackageSpec>,
}

impl DependencyGraphSpec {
    pub fn project(&self, id: &str) -> Option<&PackageSpec> {
        self.projects.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }
}

/// An analyzed target framework with its flattened dependency list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTarget {
    pub alias: String,
    pub framework: TargetFramework,
    pub dependencies: Vec<Dependency>,
}

/// An analyzed project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub file_path: PathBuf,
    pub sources: Vec<String>,
    pub targets: Vec<ProjectTarget>,
}
