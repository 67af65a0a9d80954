//! CLI argument parsing module for nugup

use crate::orchestrator::{OutdatedOptions, DEFAULT_CONCURRENCY};
use crate::resolver::{PrereleaseReporting, VersionLock};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Parse an age in days: `N` or `Nd`, `Nw` (weeks), `Nm` (30-day months)
fn parse_age_days(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty age".to_string());
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('w') {
        (n, 7)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 30)
    } else {
        (s, 1)
    };

    let num: u32 = num_str
        .parse()
        .map_err(|_| format!("invalid number in age: {}", num_str))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("age too large: {}", s))
}

/// Report outdated NuGet packages in .NET projects
#[derive(Parser, Debug, Clone)]
#[command(name = "nugup", version, about = "Report and upgrade outdated NuGet packages")]
pub struct CliArgs {
    /// Project or solution file to analyze
    pub path: PathBuf,

    // General options
    /// Enable verbose (debug) logging
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - no progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when outdated packages are found
    #[arg(long)]
    pub fail_on_updates: bool,

    // Package filters
    /// Only report packages whose name contains this text (repeatable)
    #[arg(short, long, action = ArgAction::Append)]
    pub include: Vec<String>,

    /// Skip packages whose name contains this text (repeatable)
    #[arg(short, long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    // Resolution policy
    /// Also report transitive dependencies
    #[arg(short, long)]
    pub transitive: bool,

    /// How many levels of transitive dependencies to report
    #[arg(long, default_value_t = 1)]
    pub transitive_depth: usize,

    /// Keep upgrades within the current major or minor version (none, major, minor)
    #[arg(short, long, default_value = "none")]
    pub version_lock: VersionLock,

    /// When to consider prerelease versions (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub pre_release: PrereleaseReporting,

    /// Prerelease label to stay on, e.g. `beta`
    #[arg(long)]
    pub pre_release_label: Option<String>,

    /// Only consider versions published at least this long ago (e.g. 10, 10d, 2w, 1m)
    #[arg(long, value_parser = parse_age_days)]
    pub older_than: Option<u32>,

    /// Ignore feeds that fail instead of aborting
    #[arg(long)]
    pub ignore_failed_sources: bool,

    // Process options
    /// Do not run `dotnet restore` before analysis
    #[arg(long)]
    pub no_restore: bool,

    /// Seconds without output before a `dotnet` process is killed
    #[arg(long, default_value_t = 20)]
    pub idle_timeout: u64,

    /// Maximum number of packages resolved at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    // Upgrade option
    /// Rewrite project files to the latest allowed versions
    #[arg(short, long)]
    pub upgrade: bool,
}

impl CliArgs {
    /// Convert parsed arguments into workflow options
    pub fn to_options(&self) -> OutdatedOptions {
        OutdatedOptions::new()
            .with_include(self.include.clone())
            .with_exclude(self.exclude.clone())
            .with_transitive(self.transitive, self.transitive_depth)
            .with_version_lock(self.version_lock)
            .with_prerelease(self.pre_release)
            .with_prerelease_label(self.pre_release_label.clone())
            .with_older_than_days(self.older_than)
            .with_no_restore(self.no_restore)
            .with_upgrade(self.upgrade)
            .with_ignore_failed_sources(self.ignore_failed_sources)
            .with_concurrency(self.concurrency)
            .with_idle_timeout(Duration::from_secs(self.idle_timeout))
    }
}
