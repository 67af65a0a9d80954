//! Restore graph generation and parsing
//!
//! The build tool writes a `.dg` JSON document describing every project
//! reachable from the entry manifest. This module runs that generation into
//! a temporary directory and turns the document into a [`DependencyGraphSpec`].

use crate::domain::{
    DependencyGraphSpec, DependencySpec, PackageSpec, ProjectStyle, RestoreMetadata,
    TargetFramework, TargetFrameworkSpec, VersionRange,
};
use crate::error::GraphError;
use crate::process::DotNetCli;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PROPERTY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([A-Za-z_][A-Za-z0-9_.\-]*)\)").unwrap());

#[derive(Debug, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    projects: BTreeMap<String, ProjectDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDocument {
    restore: RestoreDocument,
    #[serde(default)]
    frameworks: BTreeMap<String, FrameworkDocument>,
    #[serde(default)]
    properties: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestoreDocument {
    project_name: Option<String>,
    project_path: Option<String>,
    output_path: Option<String>,
    packages_path: Option<String>,
    project_style: Option<String>,
    #[serde(default)]
    sources: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameworkDocument {
    #[serde(default)]
    dependencies: BTreeMap<String, DependencyDocument>,
    #[serde(default)]
    central_package_versions: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyDocument {
    target: Option<String>,
    version: Option<String>,
    #[serde(default)]
    auto_referenced: bool,
    #[serde(default)]
    version_centrally_managed: bool,
}

/// Property values available for `$(Name)` substitution, looked up case-insensitively
struct Properties(HashMap<String, String>);

impl Properties {
    fn new(raw: &HashMap<String, String>) -> Self {
        Self(
            raw.iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        )
    }

    /// These properties plus `extra` entries whose names are not already defined
    fn with_fallback(&self, extra: &HashMap<String, String>) -> Self {
        let mut merged = self.0.clone();
        for (k, v) in extra {
            merged.entry(k.to_lowercase()).or_insert_with(|| v.clone());
        }
        Self(merged)
    }

    /// Substitute every `$(Name)`; `None` if any reference stays unresolved
    fn expand(&self, text: &str) -> Option<String> {
        let mut missing = false;
        let expanded = PROPERTY_REF.replace_all(text, |caps: &regex::Captures<'_>| {
            match self.0.get(&caps[1].to_lowercase()) {
                Some(value) => value.clone(),
                None => {
                    missing = true;
                    String::new()
                }
            }
        });
        if missing || expanded.contains("$(") {
            None
        } else {
            Some(expanded.into_owned())
        }
    }
}

/// Generates and parses restore graphs
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    cli: DotNetCli,
}

impl GraphBuilder {
    pub fn new(cli: DotNetCli) -> Self {
        Self { cli }
    }

    /// Ask the build tool for the restore graph of `manifest` and parse it
    pub fn generate_graph(&self, manifest: &Path) -> Result<DependencyGraphSpec, GraphError> {
        // Dropping the directory removes the graph file
        let temp = tempfile::Builder::new()
            .prefix("nugup-")
            .tempdir()
            .map_err(|source| GraphError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let output = temp.path().join("restore.dg");

        self.cli
            .generate_graph_file(manifest, &output)
            .map_err(|source| GraphError::Build {
                project: manifest.to_path_buf(),
                source,
            })?;

        let content = std::fs::read_to_string(&output).map_err(|source| GraphError::Io {
            path: output.clone(),
            source,
        })?;
        parse_graph_document(&content, &output)
    }
}

/// Parse a restore graph document. `path` is only used in error messages.
pub fn parse_graph_document(content: &str, path: &Path) -> Result<DependencyGraphSpec, GraphError> {
    let document: GraphDocument = serde_json::from_str(content)
        .map_err(|e| GraphError::parse(path, e.to_string()))?;

    let projects = document
        .projects
        .into_iter()
        .map(|(id, project)| build_package_spec(id, project))
        .collect();

    Ok(DependencyGraphSpec { projects })
}

fn build_package_spec(id: String, project: ProjectDocument) -> PackageSpec {
    let properties = Properties::new(&project.properties);
    let restore = project.restore;

    let project_path = PathBuf::from(restore.project_path.clone().unwrap_or_else(|| id.clone()));
    let name = restore.project_name.clone().unwrap_or_else(|| {
        project_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone())
    });
    let output_path = restore
        .output_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            project_path
                .parent()
                .map(|p| p.join("obj"))
                .unwrap_or_else(|| PathBuf::from("obj"))
        });
    let packages_path = restore
        .packages_path
        .as_deref()
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("NUGET_PACKAGES").map(PathBuf::from));

    let target_frameworks = project
        .frameworks
        .into_iter()
        .map(|(alias, framework)| build_framework_spec(&id, alias, framework, &properties))
        .collect();

    PackageSpec {
        id,
        name: name.clone(),
        file_path: project_path.clone(),
        restore: RestoreMetadata {
            project_name: name,
            project_path,
            output_path,
            packages_path,
            project_style: restore
                .project_style
                .as_deref()
                .map(ProjectStyle::parse)
                .unwrap_or(ProjectStyle::Unknown),
            sources: restore.sources.into_keys().collect(),
        },
        target_frameworks,
    }
}

fn build_framework_spec(
    project_id: &str,
    alias: String,
    framework: FrameworkDocument,
    properties: &Properties,
) -> TargetFrameworkSpec {
    let central: HashMap<String, String> = framework
        .central_package_versions
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();
    // Central versions double as substitution values for this framework
    let properties = properties.with_fallback(&central);

    let dependencies = framework
        .dependencies
        .into_iter()
        .filter(|(_, dep)| {
            dep.target
                .as_deref()
                .is_none_or(|t| t.eq_ignore_ascii_case("package"))
        })
        .map(|(name, dep)| {
            let raw = dep
                .version
                .clone()
                .or_else(|| {
                    dep.version_centrally_managed
                        .then(|| central.get(&name.to_lowercase()).cloned())
                        .flatten()
                });
            let version_range = raw.as_deref().and_then(|raw| {
                let expanded = properties.expand(raw);
                let range = expanded
                    .as_deref()
                    .and_then(|text| VersionRange::parse(text).ok());
                if range.is_none() {
                    tracing::debug!(
                        "{}: version '{}' of {} could not be resolved",
                        project_id,
                        raw,
                        name
                    );
                }
                range
            });

            DependencySpec {
                name,
                version_range,
                auto_referenced: dep.auto_referenced,
                centrally_managed: dep.version_centrally_managed,
            }
        })
        .collect();

    TargetFrameworkSpec {
        framework: TargetFramework::parse(&alias),
        alias,
        dependencies,
    }
}
