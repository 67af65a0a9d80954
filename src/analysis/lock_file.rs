//! `project.assets.json` reader
//!
//! Only the `targets` section is used: for each framework it lists every
//! restored library as `"Name/Version"` with the dependency ranges that
//! library declares.

use crate::domain::{
    Dependency, DependencyGraph, NuGetVersion, PackageKey, TargetFramework, VersionRange,
};
use crate::error::GraphError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the lock document inside a project's output folder
pub const ASSETS_FILE_NAME: &str = "project.assets.json";

#[derive(Debug, Deserialize)]
struct AssetsDocument {
    #[serde(default)]
    targets: BTreeMap<String, BTreeMap<String, LibraryDocument>>,
}

#[derive(Debug, Deserialize)]
struct LibraryDocument {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// One restored library of a lock target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLibrary {
    pub name: String,
    pub version: Option<NuGetVersion>,
    /// `package` or `project`
    pub kind: String,
    /// Declared dependencies as (name, raw range)
    pub dependencies: Vec<(String, String)>,
}

impl LockLibrary {
    pub fn is_package(&self) -> bool {
        self.kind.eq_ignore_ascii_case("package")
    }
}

/// The restored libraries of one framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTarget {
    pub name: String,
    pub libraries: Vec<LockLibrary>,
}

impl LockTarget {
    /// Find a library by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<&LockLibrary> {
        self.libraries
            .iter()
            .find(|lib| lib.name.eq_ignore_ascii_case(name))
    }

    /// Build the package dependency graph of this target
    pub fn to_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        let packages = self.libraries.iter().filter(|lib| lib.is_package());

        for lib in packages.clone() {
            graph.insert(
                Dependency::new(lib.name.clone(), None)
                    .with_resolved_version(lib.version.clone())
                    .with_transitive(true),
            );
        }
        for lib in packages {
            let parent = PackageKey::new(lib.name.clone());
            for (child, range) in &lib.dependencies {
                graph.add_edge(
                    &parent,
                    PackageKey::new(child.clone()),
                    VersionRange::parse(range).ok(),
                );
            }
        }
        graph
    }
}

/// A parsed lock document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
    pub targets: Vec<LockTarget>,
}

impl LockFile {
    /// Read the lock document from a project's output folder
    pub fn load(output_path: &Path) -> Result<Self, GraphError> {
        let path = output_path.join(ASSETS_FILE_NAME);
        let content = std::fs::read_to_string(&path).map_err(|source| GraphError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content, &path)
    }

    /// Parse lock document JSON. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, GraphError> {
        let document: AssetsDocument =
            serde_json::from_str(content).map_err(|e| GraphError::parse(path, e.to_string()))?;

        let targets = document
            .targets
            .into_iter()
            .map(|(name, libraries)| LockTarget {
                name,
                libraries: libraries
                    .into_iter()
                    .map(|(key, lib)| {
                        let (name, version) = match key.split_once('/') {
                            Some((name, version)) => {
                                (name.to_string(), NuGetVersion::parse(version).ok())
                            }
                            None => (key, None),
                        };
                        LockLibrary {
                            name,
                            version,
                            kind: lib.kind.unwrap_or_else(|| "package".to_string()),
                            dependencies: lib.dependencies.into_iter().collect(),
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { targets })
    }

    /// Find the target for a framework by alias or equivalent moniker.
    /// Runtime-specific targets (`framework/rid`) are never returned.
    pub fn target_for(&self, alias: &str, framework: &TargetFramework) -> Option<&LockTarget> {
        self.targets
            .iter()
            .filter(|target| !target.name.contains('/'))
            .find(|target| {
                target.name.eq_ignore_ascii_case(alias)
                    || TargetFramework::parse(&target.name).is_equivalent(framework)
            })
    }
}
