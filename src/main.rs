//! nugup - outdated NuGet package checker
//!
//! Analyzes a .NET project or solution through `dotnet`, resolves the latest
//! allowed version of every package from its feeds and optionally rewrites
//! the project files.

use clap::Parser;
use colored::Colorize;
use nugup::cli::CliArgs;
use nugup::domain::{AnalyzedDependency, UpgradeSeverity};
use nugup::orchestrator::{OutdatedReport, Orchestrator};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("nugup=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nugup=warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    if args.verbose {
        eprintln!("nugup v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Target: {}", args.path.display());
    }

    let orchestrator = Orchestrator::new(args.to_options())?;
    let report = orchestrator.run(&args.path, !args.quiet).await?;

    let mut stdout = io::stdout().lock();
    print_report(&report, &mut stdout)?;
    stdout.flush()?;

    for warning in &report.warnings {
        eprintln!("{} {}", "warning:".yellow(), warning);
    }

    if args.fail_on_updates && report.has_outdated() && !args.upgrade {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &OutdatedReport, out: &mut impl Write) -> io::Result<()> {
    if !report.has_outdated() {
        writeln!(out, "{}", "No outdated dependencies were detected".green())?;
        return Ok(());
    }

    for project in &report.projects {
        let outdated: usize = project.targets.iter().map(|t| t.outdated().count()).sum();
        if outdated == 0 {
            continue;
        }
        writeln!(out, "{}", project.name.bold())?;
        for target in &project.targets {
            let rows: Vec<_> = target.outdated().collect();
            if rows.is_empty() {
                continue;
            }
            writeln!(out, "  [{}]", target.alias.cyan())?;
            for row in rows {
                writeln!(out, "    {}", format_row(row))?;
            }
        }
        writeln!(out)?;
    }

    for record in &report.upgrades {
        let marker = if record.result.is_applied() {
            "✓".green()
        } else {
            "✗".red()
        };
        writeln!(
            out,
            "{} {} {} ({})",
            marker, record.package, record.version, record.result
        )?;
    }
    Ok(())
}

fn format_row(row: &AnalyzedDependency) -> String {
    let dependency = &row.dependency;
    let resolved = dependency
        .resolved_version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let latest = row
        .latest_version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let latest = match row.severity {
        UpgradeSeverity::Major => latest.red(),
        UpgradeSeverity::Minor => latest.yellow(),
        UpgradeSeverity::Patch => latest.green(),
        UpgradeSeverity::None | UpgradeSeverity::Unknown => latest.normal(),
    };
    let name = if dependency.transitive {
        format!("{} (transitive)", dependency.name).dimmed().to_string()
    } else {
        dependency.name.clone()
    };
    format!("{:<50} {:>16} -> {}", name, resolved, latest)
}
