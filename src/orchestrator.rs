//! Outdated-package workflow
//!
//! This module provides:
//! - Workflow coordination: analyze → filter → resolve → classify → upgrade
//! - Concurrent resolution with a bounded number of in-flight requests
//! - Package include/exclude filters
//! - An in-memory report for the CLI to print

use crate::analysis::{AnalyzeOptions, ProjectAnalyzer};
use crate::domain::{
    AnalyzedDependency, Dependency, NuGetVersion, Project, TargetFramework, VersionRange,
};
use crate::error::AppError;
use crate::process::{DotNetCli, DotNetRunner, DEFAULT_IDLE_TIMEOUT};
use crate::progress::Progress;
use crate::registry::{FeedProvider, HttpClient};
use crate::resolver::{PrereleaseReporting, ResolveRequest, VersionLock, VersionResolver};
use crate::upgrade::{PackageUpgrader, UpgradeRequest, UpgradeResult};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default number of dependencies resolved at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Options for one outdated run
#[derive(Debug, Clone)]
pub struct OutdatedOptions {
    /// If non-empty, only packages whose name contains one of these
    pub include: Vec<String>,
    /// Packages whose name contains one of these are skipped
    pub exclude: Vec<String>,
    pub include_transitive: bool,
    pub transitive_depth: usize,
    pub version_lock: VersionLock,
    pub prerelease: PrereleaseReporting,
    pub prerelease_label: Option<String>,
    /// Only consider versions published at least this many days ago
    pub older_than_days: Option<u32>,
    pub no_restore: bool,
    /// Rewrite manifests to the resolved versions
    pub upgrade: bool,
    pub ignore_failed_sources: bool,
    pub concurrency: usize,
    pub idle_timeout: Duration,
}

impl Default for OutdatedOptions {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            include_transitive: false,
            transitive_depth: 1,
            version_lock: VersionLock::default(),
            prerelease: PrereleaseReporting::default(),
            prerelease_label: None,
            older_than_days: None,
            no_restore: false,
            upgrade: false,
            ignore_failed_sources: false,
            concurrency: DEFAULT_CONCURRENCY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl OutdatedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Include transitive dependencies up to `depth` levels below direct ones
    pub fn with_transitive(mut self, include: bool, depth: usize) -> Self {
        self.include_transitive = include;
        self.transitive_depth = depth;
        self
    }

    pub fn with_version_lock(mut self, lock: VersionLock) -> Self {
        self.version_lock = lock;
        self
    }

    pub fn with_prerelease(mut self, prerelease: PrereleaseReporting) -> Self {
        self.prerelease = prerelease;
        self
    }

    pub fn with_prerelease_label(mut self, label: Option<String>) -> Self {
        self.prerelease_label = label;
        self
    }

    pub fn with_older_than_days(mut self, days: Option<u32>) -> Self {
        self.older_than_days = days;
        self
    }

    pub fn with_no_restore(mut self, no_restore: bool) -> Self {
        self.no_restore = no_restore;
        self
    }

    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }

    pub fn with_ignore_failed_sources(mut self, ignore: bool) -> Self {
        self.ignore_failed_sources = ignore;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Check a package name against the include/exclude filters (case-insensitive substring)
    pub fn should_process_package(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let matches = |filter: &String| name.contains(&filter.to_lowercase());
        if !self.include.is_empty() && !self.include.iter().any(matches) {
            return false;
        }
        !self.exclude.iter().any(matches)
    }

    fn analyze_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            run_restore: !self.no_restore,
            include_transitive: self.include_transitive,
            max_transitive_depth: self.transitive_depth,
        }
    }
}

/// Results for one target framework of a project
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub alias: String,
    pub dependencies: Vec<AnalyzedDependency>,
}

impl TargetReport {
    pub fn outdated(&self) -> impl Iterator<Item = &AnalyzedDependency> {
        self.dependencies.iter().filter(|d| d.is_outdated())
    }
}

#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub name: String,
    pub file_path: PathBuf,
    pub targets: Vec<TargetReport>,
}

/// One attempted manifest upgrade
#[derive(Debug, Clone)]
pub struct UpgradeRecord {
    pub project: PathBuf,
    pub package: String,
    pub version: NuGetVersion,
    pub result: UpgradeResult,
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct OutdatedReport {
    pub projects: Vec<ProjectReport>,
    pub upgrades: Vec<UpgradeRecord>,
    pub warnings: Vec<String>,
}

impl OutdatedReport {
    pub fn outdated_count(&self) -> usize {
        self.projects
            .iter()
            .flat_map(|p| &p.targets)
            .map(|t| t.outdated().count())
            .sum()
    }

    pub fn has_outdated(&self) -> bool {
        self.outdated_count() > 0
    }
}

/// A dependency waiting for resolution, with its place in the report
struct Job {
    project: usize,
    target: usize,
    position: usize,
    dependency: Dependency,
    request: Option<ResolveRequest>,
}

pub struct Orchestrator {
    options: OutdatedOptions,
    cli: DotNetCli,
    resolver: Arc<VersionResolver>,
}

impl Orchestrator {
    /// Create an orchestrator talking to the real `dotnet` and feeds
    pub fn new(options: OutdatedOptions) -> Result<Self, AppError> {
        let client = HttpClient::new()?;
        let feeds = Arc::new(FeedProvider::new(client));
        let resolver = VersionResolver::new(feeds)
            .with_ignore_failed_sources(options.ignore_failed_sources);
        let cli = DotNetCli::new(Arc::new(DotNetRunner::new()))
            .with_idle_timeout(options.idle_timeout);
        Ok(Self::with_components(options, cli, Arc::new(resolver)))
    }

    /// Create an orchestrator with custom components (for testing)
    pub fn with_components(
        options: OutdatedOptions,
        cli: DotNetCli,
        resolver: Arc<VersionResolver>,
    ) -> Self {
        Self {
            options,
            cli,
            resolver,
        }
    }

    pub fn options(&self) -> &OutdatedOptions {
        &self.options
    }

    /// Run the workflow for a project or solution file
    pub async fn run(&self, manifest: &Path, show_progress: bool) -> Result<OutdatedReport, AppError> {
        let mut progress = Progress::new(show_progress);

        progress.spinner(&format!("Analyzing {}...", manifest.display()));
        let analyzer = ProjectAnalyzer::new(self.cli.clone());
        let analyze_options = self.options.analyze_options();
        let path = manifest.to_path_buf();
        let projects = tokio::task::spawn_blocking(move || analyzer.analyze(&path, analyze_options))
            .await
            .map_err(|e| AppError::Task(e.to_string()))?;
        progress.finish_and_clear();
        let projects = projects?;

        self.report(projects, progress).await
    }

    /// Resolve, classify and optionally upgrade already analyzed projects
    pub async fn report(
        &self,
        projects: Vec<Project>,
        mut progress: Progress,
    ) -> Result<OutdatedReport, AppError> {
        let mut report = OutdatedReport::default();
        let jobs = self.plan(&projects, &mut report);

        progress.start(jobs.len() as u64, "Resolving");
        let ticker = progress.ticker();
        let resolver = &self.resolver;
        let mut resolved: Vec<(usize, usize, usize, AnalyzedDependency)> = stream::iter(jobs)
            .map(|job| {
                let ticker = ticker.clone();
                async move {
                    let latest = match &job.request {
                        Some(request) => Some(resolver.resolve(request).await?),
                        None => None,
                    };
                    if let Some(ticker) = ticker {
                        ticker.inc(1);
                    }
                    let analyzed = AnalyzedDependency::new(job.dependency, latest);
                    Ok::<_, AppError>((job.project, job.target, job.position, analyzed))
                }
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;
        progress.finish_and_clear();

        resolved.sort_by_key(|(project, target, position, _)| (*project, *target, *position));
        for (project, target, _, analyzed) in resolved {
            report.projects[project].targets[target]
                .dependencies
                .push(analyzed);
        }

        if self.options.upgrade {
            self.upgrade(&mut report).await?;
        }
        Ok(report)
    }

    /// Build report skeletons and one job per dependency that passes the filters
    fn plan(&self, projects: &[Project], report: &mut OutdatedReport) -> Vec<Job> {
        let mut jobs = Vec::new();
        for (p, project) in projects.iter().enumerate() {
            let mut targets = Vec::new();
            for (t, target) in project.targets.iter().enumerate() {
                targets.push(TargetReport {
                    alias: target.alias.clone(),
                    dependencies: Vec::new(),
                });

                let eligible = target
                    .dependencies
                    .iter()
                    .filter(|d| !d.auto_referenced && self.options.should_process_package(&d.name));
                for (position, dependency) in eligible.enumerate() {
                    let request = match &dependency.resolved_version {
                        Some(resolved) => {
                            Some(self.request_for(project, &target.framework, dependency, resolved))
                        }
                        None => {
                            report.warnings.push(format!(
                                "{}: no resolved version for {} ({}), run a restore first",
                                project.name, dependency.name, target.alias
                            ));
                            None
                        }
                    };
                    jobs.push(Job {
                        project: p,
                        target: t,
                        position,
                        dependency: dependency.clone(),
                        request,
                    });
                }
            }
            report.projects.push(ProjectReport {
                name: project.name.clone(),
                file_path: project.file_path.clone(),
                targets,
            });
        }
        tracing::debug!("Resolving {} dependencies", jobs.len());
        jobs
    }

    fn request_for(
        &self,
        project: &Project,
        framework: &TargetFramework,
        dependency: &Dependency,
        resolved: &NuGetVersion,
    ) -> ResolveRequest {
        // Transitive entries may carry no range of their own
        let range = dependency
            .version_range
            .clone()
            .unwrap_or_else(|| VersionRange::at_least(resolved.clone()));
        ResolveRequest::new(&dependency.name, framework.clone())
            .with_referenced_version(Some(resolved.clone()))
            .with_current_range(Some(range))
            .with_sources(project.sources.clone())
            .with_version_lock(self.options.version_lock)
            .with_prerelease(self.options.prerelease)
            .with_prerelease_label(self.options.prerelease_label.clone())
            .with_manifest_path(&project.file_path)
            .with_development_dependency(dependency.development_dependency)
            .with_older_than_days(self.options.older_than_days)
    }

    /// Apply outdated direct dependencies, once per project and package
    async fn upgrade(&self, report: &mut OutdatedReport) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for project in &report.projects {
            let single_target = project.targets.len() == 1;
            for target in &project.targets {
                for analyzed in target.outdated().filter(|d| !d.dependency.transitive) {
                    let key = (project.file_path.clone(), analyzed.dependency.name.to_lowercase());
                    let Some(latest) = &analyzed.latest_version else {
                        continue;
                    };
                    if seen.insert(key) {
                        let framework = (!single_target).then(|| target.alias.clone());
                        pending.push((
                            project.file_path.clone(),
                            analyzed.dependency.name.clone(),
                            latest.clone(),
                            framework,
                        ));
                    }
                }
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let upgrader = PackageUpgrader::new(self.cli.clone())
            .with_no_restore(self.options.no_restore)
            .with_ignore_failed_sources(self.options.ignore_failed_sources);
        let (records, warnings) = tokio::task::spawn_blocking(move || {
            let mut warnings = Vec::new();
            let mut records = Vec::new();
            for (project, package, version, framework) in pending {
                let request = UpgradeRequest {
                    project: &project,
                    package: &package,
                    version: &version,
                    framework: framework.as_deref(),
                };
                let result = upgrader.upgrade(&request, &mut |w| warnings.push(w));
                records.push(UpgradeRecord {
                    project,
                    package,
                    version,
                    result,
                });
            }
            (records, warnings)
        })
        .await
        .map_err(|e| AppError::Task(e.to_string()))?;

        report.upgrades = records;
        report.warnings.extend(warnings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = OutdatedOptions::new();
        assert!(options.include.is_empty());
        assert!(!options.include_transitive);
        assert_eq!(options.transitive_depth, 1);
        assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(options.idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert!(options.analyze_options().run_restore);
    }

    #[test]
    fn test_package_filters() {
        let options = OutdatedOptions::new()
            .with_include(vec!["microsoft".to_string()])
            .with_exclude(vec!["Logging".to_string()]);
        assert!(options.should_process_package("Microsoft.Extensions.Http"));
        assert!(!options.should_process_package("Microsoft.Extensions.Logging"));
        assert!(!options.should_process_package("Serilog"));

        let options = OutdatedOptions::new().with_exclude(vec!["serilog".to_string()]);
        assert!(!options.should_process_package("Serilog.Sinks.Console"));
        assert!(options.should_process_package("Polly"));
    }

    #[test]
    fn test_builder_methods() {
        let options = OutdatedOptions::new()
            .with_transitive(true, 3)
            .with_version_lock(VersionLock::Minor)
            .with_prerelease(PrereleaseReporting::Never)
            .with_older_than_days(Some(7))
            .with_no_restore(true)
            .with_concurrency(0);
        assert!(options.include_transitive);
        assert_eq!(options.transitive_depth, 3);
        assert_eq!(options.version_lock, VersionLock::Minor);
        assert_eq!(options.older_than_days, Some(7));
        assert_eq!(options.concurrency, 1);
        assert!(!options.analyze_options().run_restore);
    }
}
