//! Applying a resolved version to a project
//!
//! Strategies are tried in order:
//! 1. a version given through an MSBuild property is rewritten at its definition
//! 2. a literal `Version` on the project's own reference element
//! 3. the nearest `Directory.Packages.props` declaring the package
//! 4. `dotnet add package` as the last resort
//!
//! Failures never escape: they are reported through the warning callback.

use crate::domain::NuGetVersion;
use crate::error::ManifestError;
use crate::manifest::{
    update_central_version, update_package_reference, PackageVariableService, UpdateOutcome,
};
use crate::process::{AddPackageRequest, DotNetCli};
use std::fmt;
use std::path::Path;

/// How an upgrade ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeResult {
    /// A manifest file was edited (or already up to date)
    Manifest(UpdateOutcome),
    /// `dotnet add package` succeeded
    AddPackage,
    /// Nothing was changed; a warning was emitted
    NotApplied,
}

impl UpgradeResult {
    pub fn is_applied(&self) -> bool {
        match self {
            UpgradeResult::Manifest(outcome) => outcome.is_applied(),
            UpgradeResult::AddPackage => true,
            UpgradeResult::NotApplied => false,
        }
    }
}

impl fmt::Display for UpgradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeResult::Manifest(outcome) => write!(f, "{}", outcome),
            UpgradeResult::AddPackage => write!(f, "updated via dotnet add package"),
            UpgradeResult::NotApplied => write!(f, "not updated"),
        }
    }
}

/// One package to upgrade in one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest<'a> {
    pub project: &'a Path,
    pub package: &'a str,
    pub version: &'a NuGetVersion,
    /// Framework alias passed to `dotnet add package -f`
    pub framework: Option<&'a str>,
}

pub struct PackageUpgrader {
    variables: PackageVariableService,
    cli: DotNetCli,
    no_restore: bool,
    ignore_failed_sources: bool,
}

impl PackageUpgrader {
    pub fn new(cli: DotNetCli) -> Self {
        Self {
            variables: PackageVariableService::new(),
            cli,
            no_restore: false,
            ignore_failed_sources: false,
        }
    }

    pub fn with_no_restore(mut self, no_restore: bool) -> Self {
        self.no_restore = no_restore;
        self
    }

    pub fn with_ignore_failed_sources(mut self, ignore: bool) -> Self {
        self.ignore_failed_sources = ignore;
        self
    }

    /// Apply `request`, reporting problems to `warn`.
    ///
    /// A failing strategy is reported and the next one is tried; only a
    /// skipped edit (a version built from nested properties) ends the chain.
    pub fn upgrade(&self, request: &UpgradeRequest<'_>, warn: &mut dyn FnMut(String)) -> UpgradeResult {
        let version = request.version.to_string();
        let mut property_failed = false;
        let mut literal_failed = false;

        match self.variables.lookup(request.project, request.package) {
            Ok(Some(info)) => match self.variables.update(&info, &version) {
                Ok(outcome) => return Self::finish(outcome, warn),
                Err(e) => {
                    warn(format!("{}: {}", request.package, e));
                    property_failed = info.is_variable();
                    literal_failed = !property_failed;
                }
            },
            Ok(None) => {}
            Err(e) => tracing::debug!("Property discovery failed: {}", e),
        }

        // Reported only if the central file does not declare the package either
        let mut not_found = None;
        if !literal_failed {
            match update_package_reference(request.project, request.package, &version) {
                // The property was already reported; its reference is not editable here
                Ok(UpdateOutcome::Skipped { .. }) if property_failed => {}
                Ok(outcome) => return Self::finish(outcome, warn),
                Err(
                    e @ (ManifestError::PackageNotFound { .. }
                    | ManifestError::MissingVersionAttribute { .. }),
                ) => not_found = Some(format!("{}: {}", request.package, e)),
                Err(e) => warn(format!("{}: {}", request.package, e)),
            }
        }

        match update_central_version(request.project, request.package, &version) {
            Ok(Some(outcome)) => return Self::finish(outcome, warn),
            Ok(None) => {}
            Err(e) => warn(format!("{}: {}", request.package, e)),
        }

        if let Some(message) = not_found {
            warn(message);
        }
        self.add_package(request, version, warn)
    }

    fn finish(outcome: UpdateOutcome, warn: &mut dyn FnMut(String)) -> UpgradeResult {
        if let UpdateOutcome::Skipped { .. } = &outcome {
            warn(outcome.to_string());
        }
        UpgradeResult::Manifest(outcome)
    }

    fn add_package(
        &self,
        request: &UpgradeRequest<'_>,
        version: String,
        warn: &mut dyn FnMut(String),
    ) -> UpgradeResult {
        let add = AddPackageRequest {
            project: request.project.to_path_buf(),
            package: request.package.to_string(),
            version,
            framework: request.framework.map(str::to_string),
            no_restore: self.no_restore,
            ignore_failed_sources: self.ignore_failed_sources,
        };
        match self.cli.add_package(&add) {
            Ok(status) if status.is_success() => UpgradeResult::AddPackage,
            Ok(status) => {
                warn(format!(
                    "dotnet add package {} failed with exit code {}: {}",
                    request.package,
                    status.exit_code,
                    status.stderr.trim()
                ));
                UpgradeResult::NotApplied
            }
            Err(e) => {
                warn(e.to_string());
                UpgradeResult::NotApplied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildToolError;
    use crate::process::{CommandRunner, RunStatus};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    struct RecordingRunner {
        calls: Mutex<Vec<Vec<String>>>,
        exit_code: i32,
    }

    impl CommandRunner for RecordingRunner {
        fn run(
            &self,
            _working_dir: &Path,
            args: &[String],
            _idle_timeout: Duration,
        ) -> Result<RunStatus, BuildToolError> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(RunStatus::new("", "error NU1101", self.exit_code))
        }
    }

    fn upgrader(exit_code: i32) -> (PackageUpgrader, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner {
            calls: Mutex::new(Vec::new()),
            exit_code,
        });
        let cli = DotNetCli::new(runner.clone());
        (PackageUpgrader::new(cli).with_no_restore(true), runner)
    }

    fn project(temp: &TempDir, content: &str) -> PathBuf {
        let path = temp.path().join("App.csproj");
        fs::write(&path, content).unwrap();
        path
    }

    fn request<'a>(path: &'a Path, package: &'a str, version: &'a NuGetVersion) -> UpgradeRequest<'a> {
        UpgradeRequest {
            project: path,
            package,
            version,
            framework: None,
        }
    }

    #[test]
    fn test_literal_reference() {
        let temp = TempDir::new().unwrap();
        let path = project(
            &temp,
            r#"<Project><ItemGroup><PackageReference Include="A" Version="1.0.0" /></ItemGroup></Project>"#,
        );
        let (upgrader, runner) = upgrader(0);
        let version = NuGetVersion::parse("1.2.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(&request(&path, "A", &version), &mut |w| warnings.push(w));
        assert!(result.is_applied());
        assert!(warnings.is_empty());
        assert!(runner.calls.lock().unwrap().is_empty());
        assert!(fs::read_to_string(&path).unwrap().contains("Version=\"1.2.0\""));
    }

    #[test]
    fn test_nested_variable_warns() {
        let temp = TempDir::new().unwrap();
        let path = project(
            &temp,
            r#"<Project><PropertyGroup><Base>1.0.0</Base><AVersion>$(Base)</AVersion></PropertyGroup><ItemGroup><PackageReference Include="A" Version="$(AVersion)" /></ItemGroup></Project>"#,
        );
        let (upgrader, runner) = upgrader(0);
        let version = NuGetVersion::parse("2.0.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(&request(&path, "A", &version), &mut |w| warnings.push(w));
        assert!(!result.is_applied());
        assert_eq!(warnings.len(), 1);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_falls_back_to_add_package() {
        let temp = TempDir::new().unwrap();
        let path = project(&temp, "<Project><ItemGroup /></Project>");
        let (upgrader, runner) = upgrader(0);
        let version = NuGetVersion::parse("2.0.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(
            &UpgradeRequest {
                framework: Some("net8.0"),
                ..request(&path, "A", &version)
            },
            &mut |w| warnings.push(w),
        );
        assert_eq!(result, UpgradeResult::AddPackage);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "add");
        assert!(calls[0].contains(&"--no-restore".to_string()));
        assert!(calls[0].contains(&"net8.0".to_string()));
    }

    #[test]
    fn test_add_package_failure_warns() {
        let temp = TempDir::new().unwrap();
        let path = project(&temp, "<Project />");
        let (upgrader, _) = upgrader(1);
        let version = NuGetVersion::parse("2.0.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(&request(&path, "A", &version), &mut |w| warnings.push(w));
        assert_eq!(result, UpgradeResult::NotApplied);
        assert!(warnings[0].contains("NU1101"));
    }

    #[test]
    fn test_broken_project_falls_back_to_add_package() {
        let temp = TempDir::new().unwrap();
        let path = project(&temp, "<Project><ItemGroup><PackageReference Include=\"A\" Version=\"1.0.0\" />");
        let (upgrader, runner) = upgrader(0);
        let version = NuGetVersion::parse("2.0.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(&request(&path, "A", &version), &mut |w| warnings.push(w));
        assert_eq!(result, UpgradeResult::AddPackage);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("A: "));
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "add");
    }

    #[test]
    fn test_undefined_property_falls_back_to_add_package() {
        let temp = TempDir::new().unwrap();
        let path = project(
            &temp,
            r#"<Project><ItemGroup><PackageReference Include="A" Version="$(Missing)" /></ItemGroup></Project>"#,
        );
        let before = fs::read_to_string(&path).unwrap();
        let (upgrader, runner) = upgrader(0);
        let version = NuGetVersion::parse("2.0.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(&request(&path, "A", &version), &mut |w| warnings.push(w));
        assert_eq!(result, UpgradeResult::AddPackage);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Missing"));
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "add");
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_missing_reference_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = project(&temp, "<Project><ItemGroup /></Project>");
        let (upgrader, runner) = upgrader(0);
        let version = NuGetVersion::parse("2.0.0").unwrap();
        let mut warnings = Vec::new();

        let result = upgrader.upgrade(&request(&path, "A", &version), &mut |w| warnings.push(w));
        assert_eq!(result, UpgradeResult::AddPackage);
        assert_eq!(warnings.len(), 1);
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }
}
