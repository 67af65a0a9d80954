//! End-to-end tests for the nugup CLI
//!
//! These tests verify:
//! - Help and version output
//! - Argument validation and exit codes
//! - Project path validation before any `dotnet` call

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn nugup() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nugup"))
}

mod exit_code_tests {
    use super::*;

    #[test]
    fn test_help() {
        nugup()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("nugup"))
            .stdout(predicate::str::contains("--version-lock"))
            .stdout(predicate::str::contains("--transitive"));
    }

    #[test]
    fn test_version() {
        nugup()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_missing_path_argument() {
        nugup()
            .assert()
            .failure()
            .stderr(predicate::str::contains("<PATH>"));
    }

    #[test]
    fn test_nonexistent_project() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("Missing.csproj");
        nugup()
            .args(["--quiet", "--no-restore"])
            .arg(&missing)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("does not exist"));
    }
}

mod cli_options_tests {
    use super::*;

    #[test]
    fn test_invalid_version_lock() {
        nugup()
            .args(["App.csproj", "--version-lock", "patch"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("patch"));
    }

    #[test]
    fn test_invalid_prerelease_policy() {
        nugup()
            .args(["App.csproj", "--pre-release", "sometimes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("sometimes"));
    }

    #[test]
    fn test_invalid_age() {
        nugup()
            .args(["App.csproj", "--older-than", "3y"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid number in age"));
    }
}
