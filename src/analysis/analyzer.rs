//! Project analysis: graph + lock document -> flat dependency lists

use super::graph_builder::GraphBuilder;
use super::lock_file::LockFile;
use crate::domain::{
    Dependency, PackageKey, PackageSpec, Project, ProjectStyle, ProjectTarget,
    TargetFrameworkSpec,
};
use crate::error::{AppError, ValidationError};
use crate::nuspec;
use crate::process::DotNetCli;
use std::path::Path;

/// What to analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeOptions {
    pub run_restore: bool,
    pub include_transitive: bool,
    pub max_transitive_depth: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            run_restore: true,
            include_transitive: false,
            max_transitive_depth: 1,
        }
    }
}

/// Turns a manifest into analyzed projects
#[derive(Debug, Clone)]
pub struct ProjectAnalyzer {
    builder: GraphBuilder,
    cli: DotNetCli,
}

impl ProjectAnalyzer {
    pub fn new(cli: DotNetCli) -> Self {
        Self {
            builder: GraphBuilder::new(cli.clone()),
            cli,
        }
    }

    /// Analyze every PackageReference-style project reachable from `manifest`
    pub fn analyze(&self, manifest: &Path, options: AnalyzeOptions) -> Result<Vec<Project>, AppError> {
        if !manifest.is_file() {
            return Err(ValidationError::InvalidProject {
                path: manifest.to_path_buf(),
                message: "file does not exist".to_string(),
            }
            .into());
        }

        let graph = self.builder.generate_graph(manifest)?;
        let mut projects = Vec::new();

        for spec in &graph.projects {
            if spec.restore.project_style != ProjectStyle::PackageReference {
                tracing::debug!(
                    "Skipping {} ({} projects are not analyzed)",
                    spec.name,
                    spec.restore.project_style
                );
                continue;
            }

            if options.run_restore {
                self.restore(spec);
            }

            let lock = match LockFile::load(&spec.restore.output_path) {
                Ok(lock) => lock,
                Err(e) => {
                    tracing::warn!("{}: {}", spec.name, e);
                    LockFile::default()
                }
            };

            projects.push(analyze_project(spec, &lock, options));
        }

        Ok(projects)
    }

    /// A failed restore is logged; analysis continues with whatever lock document exists
    fn restore(&self, spec: &PackageSpec) {
        match self.cli.restore(&spec.file_path) {
            Ok(status) if status.is_success() => {}
            Ok(status) => tracing::warn!(
                "Restore of {} failed with exit code {}: {}",
                spec.name,
                status.exit_code,
                status.stderr.trim()
            ),
            Err(e) => tracing::warn!("Restore of {} failed: {}", spec.name, e),
        }
    }
}

/// Build the analyzed project from its spec and lock document
pub fn analyze_project(spec: &PackageSpec, lock: &LockFile, options: AnalyzeOptions) -> Project {
    let targets = spec
        .target_frameworks
        .iter()
        .map(|framework| analyze_framework(spec, framework, lock, options))
        .collect();

    Project {
        name: spec.name.clone(),
        file_path: spec.file_path.clone(),
        sources: spec.sources().to_vec(),
        targets,
    }
}

fn analyze_framework(
    spec: &PackageSpec,
    framework: &TargetFrameworkSpec,
    lock: &LockFile,
    options: AnalyzeOptions,
) -> ProjectTarget {
    let mut target = ProjectTarget {
        alias: framework.alias.clone(),
        framework: framework.framework.clone(),
        dependencies: Vec::new(),
    };

    let Some(lock_target) = lock.target_for(&framework.alias, &framework.framework) else {
        tracing::warn!(
            "{}: no restored target for {}, run a restore first",
            spec.name,
            framework.alias
        );
        return target;
    };

    for declared in &framework.dependencies {
        let resolved = lock_target
            .find(&declared.name)
            .and_then(|lib| lib.version.clone());
        let development = match (&spec.restore.packages_path, &resolved) {
            (Some(packages), Some(version)) => {
                nuspec::is_development_dependency(packages, &declared.name, version)
            }
            _ => false,
        };

        target.dependencies.push(
            Dependency::new(declared.name.clone(), declared.version_range.clone())
                .with_resolved_version(resolved)
                .with_auto_referenced(declared.auto_referenced)
                .with_centrally_managed(declared.centrally_managed)
                .with_development_dependency(development),
        );
    }

    if options.include_transitive && options.max_transitive_depth > 0 {
        let graph = lock_target.to_graph();
        let roots: Vec<PackageKey> = target
            .dependencies
            .iter()
            .map(|dep| PackageKey::new(dep.name.clone()))
            .collect();

        for visit in graph.walk_transitive(&roots, options.max_transitive_depth) {
            let Some(node) = visit.node else {
                continue;
            };
            if target.dependencies.iter().any(|d| d.is_named(&node.dependency.name)) {
                continue;
            }
            target.dependencies.push(
                Dependency::new(node.dependency.name.clone(), visit.range.cloned())
                    .with_resolved_version(node.dependency.resolved_version.clone())
                    .with_transitive(true),
            );
        }
    }

    target
}
