//! `dotnet` command lines

use super::{CommandRunner, RunStatus, DEFAULT_IDLE_TIMEOUT};
use crate::error::BuildToolError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Parameters for `dotnet add package`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPackageRequest {
    pub project: PathBuf,
    pub package: String,
    pub version: String,
    pub framework: Option<String>,
    pub no_restore: bool,
    pub ignore_failed_sources: bool,
}

/// Builds `dotnet` invocations and runs them through a [`CommandRunner`]
#[derive(Clone)]
pub struct DotNetCli {
    runner: Arc<dyn CommandRunner>,
    idle_timeout: Duration,
}

impl DotNetCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Arguments asking msbuild to restore and write the restore graph to `output`
    pub fn graph_arguments(project: &Path, output: &Path) -> Vec<String> {
        vec![
            "msbuild".to_string(),
            project.display().to_string(),
            "/p:NoWarn=NU1605".to_string(),
            "/p:RestoreUseStaticGraphEvaluation=false".to_string(),
            "/t:Restore,GenerateRestoreGraphFile".to_string(),
            format!("/p:RestoreGraphOutputPath={}", output.display()),
        ]
    }

    pub fn restore_arguments(project: &Path) -> Vec<String> {
        vec!["restore".to_string(), project.display().to_string()]
    }

    pub fn add_package_arguments(request: &AddPackageRequest) -> Vec<String> {
        let mut args = vec![
            "add".to_string(),
            request.project.display().to_string(),
            "package".to_string(),
            request.package.clone(),
            "-v".to_string(),
            request.version.clone(),
        ];
        if let Some(framework) = &request.framework {
            args.push("-f".to_string());
            args.push(framework.clone());
        }
        if request.no_restore {
            args.push("--no-restore".to_string());
        }
        if request.ignore_failed_sources {
            args.push("--ignore-failed-sources".to_string());
        }
        args
    }

    fn working_dir(project: &Path) -> &Path {
        match project.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn run(&self, project: &Path, args: Vec<String>) -> Result<RunStatus, BuildToolError> {
        self.runner
            .run(Self::working_dir(project), &args, self.idle_timeout)
    }

    /// Run graph generation, failing on a non-zero exit
    pub fn generate_graph_file(
        &self,
        project: &Path,
        output: &Path,
    ) -> Result<RunStatus, BuildToolError> {
        let args = Self::graph_arguments(project, output);
        let command = format!("dotnet {}", args.join(" "));
        self.run(project, args)?.into_result(command)
    }

    /// Run `dotnet restore`, returning the status whatever the exit code
    pub fn restore(&self, project: &Path) -> Result<RunStatus, BuildToolError> {
        self.run(project, Self::restore_arguments(project))
    }

    /// Run `dotnet add package`, returning the status whatever the exit code
    pub fn add_package(&self, request: &AddPackageRequest) -> Result<RunStatus, BuildToolError> {
        self.run(&request.project, Self::add_package_arguments(request))
    }
}

impl std::fmt::Debug for DotNetCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DotNetCli")
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
